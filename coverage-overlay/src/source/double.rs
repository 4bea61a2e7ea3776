// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use coverage_client::{ClientError, LineCoverage, RecordType};
use tokio::sync::{Notify, RwLock};

use super::*;

/// Serves canned line coverage per path and counts the fetches it sees.
/// Unknown paths answer 404.
#[derive(Debug, Default)]
pub struct CoverageSourceDouble {
    pub files: Arc<RwLock<HashMap<String, Option<LineCoverage>>>>,
    pub fetches: AtomicUsize,

    /// When set, every fetch waits for a notification before answering.
    pub gate: Option<Arc<Notify>>,
}

impl CoverageSourceDouble {
    pub async fn with_file(self, path: &str, coverage: Option<LineCoverage>) -> Self {
        self.files.write().await.insert(path.to_owned(), coverage);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoverageSource for CoverageSourceDouble {
    async fn fetch_coverage(&self, revision: &str, path: &str) -> Result<FileRecord> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let files = self.files.read().await;
        let coverage = files.get(path).cloned().ok_or(ClientError::Request {
            status: 404,
            status_text: "Not Found".to_owned(),
        })?;

        Ok(FileRecord {
            path: path.to_owned(),
            kind: RecordType::File,
            coverage,
            changeset: Some(revision.to_owned()),
            ..Default::default()
        })
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use coverage_client::{ClientError, FileRecord};
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::OverlayError;
use crate::source::CoverageSource;

pub type SharedFetch = Shared<BoxFuture<'static, Result<Arc<FileRecord>, Arc<ClientError>>>>;

/// At most one coverage fetch per `(revision, path)`, ever.
///
/// The first caller starts the fetch; everyone after attaches to the same
/// shared future, before or after it resolves. Failures are kept as well, so
/// a failed file is not fetched again.
pub struct CoverageMemo {
    source: Arc<dyn CoverageSource>,
    fetches: Mutex<HashMap<(String, String), SharedFetch>>,
}

impl CoverageMemo {
    pub fn new(source: Arc<dyn CoverageSource>) -> Self {
        Self {
            source,
            fetches: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, revision: &str, path: &str) -> SharedFetch {
        let mut fetches = self.fetches.lock().unwrap_or_else(PoisonError::into_inner);

        fetches
            .entry((revision.to_owned(), path.to_owned()))
            .or_insert_with(|| {
                debug!("fetching coverage for {} @ {}", path, revision);

                let source = self.source.clone();
                let revision = revision.to_owned();
                let path = path.to_owned();

                async move {
                    source
                        .fetch_coverage(&revision, &path)
                        .await
                        .map(Arc::new)
                        .map_err(Arc::new)
                }
                .boxed()
                .shared()
            })
            .clone()
    }

    pub async fn fetch(&self, revision: &str, path: &str) -> Result<Arc<FileRecord>, OverlayError> {
        let fetch = self.get(revision, path);
        let record = fetch.await?;
        Ok(record)
    }

    /// Start fetching in the background, ahead of the first toggle.
    pub fn preload(&self, revision: &str, path: &str) {
        let fetch = self.get(revision, path);
        tokio::spawn(fetch);
    }

    pub fn len(&self) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

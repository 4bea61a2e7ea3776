// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use async_trait::async_trait;
use coverage_client::{CoverageClient, FileRecord, Result};

/// Where overlays get per-file coverage from.
#[async_trait]
pub trait CoverageSource: Send + Sync {
    async fn fetch_coverage(&self, revision: &str, path: &str) -> Result<FileRecord>;
}

#[async_trait]
impl CoverageSource for CoverageClient {
    async fn fetch_coverage(&self, revision: &str, path: &str) -> Result<FileRecord> {
        self.get_path_coverage(path, Some(revision), None, None).await
    }
}

#[cfg(test)]
pub mod double;

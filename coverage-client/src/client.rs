// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::{Client, Response};
use reqwest_retry::{PollRetry, PENDING_STATUS};
use serde::Deserialize;
use tokio::sync::OnceCell;
use url::Url;

use crate::cache::{Clock, FetchCache};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::http::ResponseExt;
use crate::types::{
    ChangesetSummary, FileRecord, Filters, HistoryPoint, LatestRevision, LineCoverage,
    RawZeroCoverageReport, ZeroCoverageReport, ALL, REV_LATEST,
};

/// Location, inside the hg repository, of the list of vendored path prefixes.
pub const THIRD_PARTY_PATHS: &str = "tools/rewriting/ThirdPartyPaths.txt";

/// Client for the coverage backend and the static artifacts around it.
///
/// Each instance owns its response caches; build one per application and
/// share it.
pub struct CoverageClient {
    client: Client,
    config: ClientConfig,
    path_cache: Mutex<FetchCache<FileRecord>>,
    history_cache: Mutex<FetchCache<Vec<HistoryPoint>>>,
    filters_cache: Mutex<FetchCache<Filters>>,
    zero_coverage_cache: Mutex<FetchCache<ZeroCoverageReport>>,
    third_party_paths: OnceCell<Arc<Vec<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Query values the backend treats as "no filter" are left out of requests.
fn specific(value: Option<&str>, sentinel: &str) -> Option<String> {
    value
        .filter(|value| !value.is_empty() && *value != sentinel)
        .map(str::to_owned)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLatest {
    Single(LatestRevision),
    Reports(Vec<LatestReport>),
}

#[derive(Deserialize)]
struct LatestReport {
    revision: String,
}

#[derive(Deserialize)]
struct RawFileCoverage {
    data: Option<LineCoverage>,
    error: Option<String>,
}

impl CoverageClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_clock(config, Arc::new(chrono::Utc::now))
    }

    pub fn with_clock(config: ClientConfig, clock: Clock) -> Self {
        Self {
            client: Client::new(),
            config,
            path_cache: Mutex::new(FetchCache::with_clock(clock.clone())),
            history_cache: Mutex::new(FetchCache::with_clock(clock.clone())),
            filters_cache: Mutex::new(FetchCache::with_clock(clock.clone())),
            zero_coverage_cache: Mutex::new(FetchCache::with_clock(clock)),
            third_party_paths: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn join(base: &Url, path: &str) -> Result<Url> {
        let base = base.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{}/{}", base, path.trim_start_matches('/')))?;
        Ok(url)
    }

    fn backend_url(&self, path: &str) -> Result<Url> {
        Self::join(&self.config.backend_url, path)
    }

    async fn get(&self, url: Url) -> Result<Response> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Ok(response)
    }

    /// Coverage for a directory (direct children with their aggregate
    /// percentages) or a file (per-line hit counts), depending on `path`.
    pub async fn get_path_coverage(
        &self,
        path: &str,
        changeset: Option<&str>,
        platform: Option<&str>,
        suite: Option<&str>,
    ) -> Result<FileRecord> {
        let mut url = self.backend_url("/v2/path")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("path", path);
            if let Some(changeset) = specific(changeset, REV_LATEST) {
                query.append_pair("changeset", &changeset);
            }
            if let Some(platform) = specific(platform, ALL) {
                query.append_pair("platform", &platform);
            }
            if let Some(suite) = specific(suite, ALL) {
                query.append_pair("suite", &suite);
            }
        }

        // The request URL carries every parameter that shapes the response.
        let key = url.to_string();
        let cached = lock(&self.path_cache).get_cloned(&key);
        if let Some(data) = cached {
            return Ok(data);
        }

        let data: FileRecord = self.get(url).await?.json_checked().await?;
        lock(&self.path_cache).set(key, data.clone());

        Ok(data)
    }

    /// Overall coverage of `path` at each ingested push.
    ///
    /// Returns `Ok(None)` when no point carries a coverage value, which is
    /// distinct from a path whose coverage is zero.
    pub async fn get_history(
        &self,
        path: &str,
        platform: Option<&str>,
        suite: Option<&str>,
    ) -> Result<Option<Vec<HistoryPoint>>> {
        let path = path.strip_suffix('/').unwrap_or(path);

        let mut url = self.backend_url("/v2/history")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("path", path);
            if let Some(platform) = specific(platform, ALL) {
                query.append_pair("platform", &platform);
            }
            if let Some(suite) = specific(suite, ALL) {
                query.append_pair("suite", &suite);
            }
        }

        let key = url.to_string();
        let cached = lock(&self.history_cache).get_cloned(&key);
        let data = match cached {
            Some(data) => data,
            None => {
                let data: Vec<HistoryPoint> = self.get(url).await?.json_checked().await?;
                lock(&self.history_cache).set(key, data.clone());
                data
            }
        };

        if data.iter().all(|point| point.coverage.is_none()) {
            warn!("no history data for {}", path);
            return Ok(None);
        }

        Ok(Some(data))
    }

    pub async fn get_latest_revision(&self) -> Result<String> {
        let url = self.backend_url("/coverage/latest")?;
        let latest: RawLatest = self.get(url).await?.json_checked().await?;

        let revision = match latest {
            RawLatest::Single(latest) => latest.latest_rev,
            RawLatest::Reports(reports) => reports.into_iter().next().map(|r| r.revision),
        };

        revision.ok_or(ClientError::MissingData("latest_rev"))
    }

    pub async fn get_filters(&self) -> Result<Filters> {
        let url = self.backend_url("/v2/filters")?;

        let key = url.to_string();
        let cached = lock(&self.filters_cache).get_cloned(&key);
        if let Some(data) = cached {
            return Ok(data);
        }

        let data: Filters = self.get(url).await?.json_checked().await?;
        lock(&self.filters_cache).set(key, data.clone());

        Ok(data)
    }

    pub async fn get_zero_coverage_data(&self) -> Result<ZeroCoverageReport> {
        let url = self.config.zero_coverage_url.clone();

        let key = url.to_string();
        let cached = lock(&self.zero_coverage_cache).get_cloned(&key);
        if let Some(data) = cached {
            return Ok(data);
        }

        let raw: RawZeroCoverageReport = self.get(url).await?.json_checked().await?;
        let revision = raw
            .hg_revision
            .or(raw.github_revision)
            .ok_or(ClientError::MissingData("hg_revision"))?;
        let data = ZeroCoverageReport {
            files: raw.files.into_iter().map(FileRecord::from).collect(),
            revision,
        };

        lock(&self.zero_coverage_cache).set(key, data.clone());

        Ok(data)
    }

    /// Lines added and covered by a changeset.
    ///
    /// The backend computes summaries on demand and answers `202 Accepted`
    /// until the result is ready. The request is repeated at the configured
    /// interval for as long as that lasts; with the default policy there is no
    /// attempt limit.
    pub async fn get_changeset_summary(&self, revision: &str) -> Result<ChangesetSummary> {
        let url = self.backend_url(&format!("/coverage/changeset_summary/{}", revision))?;
        debug!("GET {} (polling)", url);

        let response = self
            .client
            .get(url)
            .poll_until_ready(PENDING_STATUS, self.config.changeset_poll)
            .await?;

        response.json_checked().await
    }

    /// Per-line coverage from the legacy `/coverage/file` endpoint.
    pub async fn get_file_coverage(&self, changeset: &str, path: &str) -> Result<LineCoverage> {
        let mut url = self.backend_url("/coverage/file")?;
        url.query_pairs_mut()
            .append_pair("changeset", changeset)
            .append_pair("path", path);

        let raw: RawFileCoverage = self.get(url).await?.json_checked().await?;

        if let Some(error) = raw.error {
            warn!("file coverage for {} @ {} failed: {}", path, changeset, error);
            return Err(ClientError::MissingData("data"));
        }

        raw.data.ok_or(ClientError::MissingData("data"))
    }

    /// Raw source of `path` at `revision`; `latest` reads the tip.
    pub async fn get_source(&self, path: &str, revision: Option<&str>) -> Result<String> {
        let revision = specific(revision, REV_LATEST).unwrap_or_else(|| "tip".to_owned());
        let url = Self::join(
            &self.config.hg_url,
            &format!("raw-file/{}/{}", revision, path.trim_start_matches('/')),
        )?;

        self.get(url).await?.text_checked().await
    }

    /// Path prefixes of vendored code, fetched on first use and kept for the
    /// lifetime of the client.
    pub async fn third_party_paths(&self) -> Result<Arc<Vec<String>>> {
        let paths = self
            .third_party_paths
            .get_or_try_init(|| async {
                let text = self.get_source(THIRD_PARTY_PATHS, None).await?;
                let paths: Vec<String> = text
                    .split('\n')
                    .filter(|path| !path.is_empty())
                    .map(str::to_owned)
                    .collect();
                info!("loaded {} third-party path prefixes", paths.len());
                Ok::<_, ClientError>(Arc::new(paths))
            })
            .await?;

        Ok(paths.clone())
    }

    /// Map a gecko-dev git revision to its mozilla-central hg revision.
    pub async fn git_to_hg(&self, git_revision: &str) -> Result<String> {
        let url = Self::join(
            &self.config.mapper_url,
            &format!("gecko-dev/rev/git/{}", git_revision),
        )?;

        let text = self.get(url).await?.text_checked().await?;

        text.split_whitespace()
            .nth(1)
            .map(str::to_owned)
            .ok_or_else(|| ClientError::Malformed(format!("unexpected mapper answer: {:?}", text)))
    }
}

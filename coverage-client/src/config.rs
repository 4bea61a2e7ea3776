// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest_retry::PollPolicy;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_BACKEND_URL: &str = "https://coverage.testing.moz.tools";
pub const DEFAULT_ZERO_COVERAGE_URL: &str = "https://index.taskcluster.net/v1/task/project.releng.services.project.production.code_coverage_bot.latest/artifacts/public/zero_coverage_report.json";
pub const DEFAULT_HG_URL: &str = "https://hg.mozilla.org/mozilla-central";
pub const DEFAULT_MAPPER_URL: &str = "https://mapper.mozilla-releng.net";

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct ClientConfig {
    /// Coverage backend serving `/v2/*` and `/coverage/*`.
    #[serde(default = "default_backend_url")]
    pub backend_url: Url,

    /// Static artifact holding the zero-coverage report.
    #[serde(default = "default_zero_coverage_url")]
    pub zero_coverage_url: Url,

    /// Mercurial repository used for raw sources and the third-party list.
    #[serde(default = "default_hg_url")]
    pub hg_url: Url,

    /// git to hg revision mapper.
    #[serde(default = "default_mapper_url")]
    pub mapper_url: Url,

    #[serde(default)]
    pub changeset_poll: PollPolicy,
}

fn parse_default(url: &str) -> Url {
    // Unwrap-safe: constant inputs, covered by `test_defaults`.
    Url::parse(url).unwrap()
}

fn default_backend_url() -> Url {
    parse_default(DEFAULT_BACKEND_URL)
}

fn default_zero_coverage_url() -> Url {
    parse_default(DEFAULT_ZERO_COVERAGE_URL)
}

fn default_hg_url() -> Url {
    parse_default(DEFAULT_HG_URL)
}

fn default_mapper_url() -> Url {
    parse_default(DEFAULT_MAPPER_URL)
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            zero_coverage_url: default_zero_coverage_url(),
            hg_url: default_hg_url(),
            mapper_url: default_mapper_url(),
            changeset_poll: PollPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(data: &[u8]) -> Result<Self> {
        let config = serde_json::from_slice(data)?;
        Ok(config)
    }

    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();

        let data = std::fs::read(config_path)
            .with_context(|| format!("unable to read config file: {}", config_path.display()))?;

        Self::new(&data)
            .with_context(|| format!("unable to parse config file: {}", config_path.display()))
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        let url = |name: &str| -> Result<Option<Url>> {
            var(name)
                .map(|value| Url::parse(&value).with_context(|| format!("invalid {}", name)))
                .transpose()
        };

        if let Some(backend_url) = url("CODECOV_BACKEND_URL")? {
            config.backend_url = backend_url;
        }

        if let Some(zero_coverage_url) = url("CODECOV_ZERO_COVERAGE_URL")? {
            config.zero_coverage_url = zero_coverage_url;
        }

        if let Some(hg_url) = url("CODECOV_HG_URL")? {
            config.hg_url = hg_url;
        }

        if let Some(mapper_url) = url("CODECOV_MAPPER_URL")? {
            config.mapper_url = mapper_url;
        }

        if let Some(secs) = var("CODECOV_POLL_INTERVAL_SECS") {
            let secs: u64 = secs
                .parse()
                .context("invalid CODECOV_POLL_INTERVAL_SECS")?;
            config.changeset_poll.interval = Duration::from_secs(secs);
        }

        if let Some(max) = var("CODECOV_POLL_MAX_ATTEMPTS") {
            let max: usize = max.parse().context("invalid CODECOV_POLL_MAX_ATTEMPTS")?;
            config.changeset_poll.max_attempts = Some(max);
        }

        Ok(config)
    }
}

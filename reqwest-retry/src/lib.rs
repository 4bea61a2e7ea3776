// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Polling for endpoints that answer "not ready yet" while a backend job runs.
//!
//! The poll re-sends the same request at a fixed interval for as long as the
//! server replies with the pending status. There is no backoff. Unless the
//! [`PollPolicy`] sets `max_attempts`, there is also no upper bound on the
//! number of attempts: a job that never finishes keeps the caller waiting.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use backoff::{backoff::Constant, future::retry_notify};
use log::debug;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Status code used by the coverage backend for "still processing".
pub const PENDING_STATUS: StatusCode = StatusCode::ACCEPTED;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(from = "RawPollPolicy")]
pub struct PollPolicy {
    pub interval: Duration,

    /// `None` polls until the server stops answering with the pending status.
    pub max_attempts: Option<usize>,
}

#[derive(Deserialize)]
struct RawPollPolicy {
    #[serde(default = "default_interval_secs")]
    interval_secs: u64,

    #[serde(default)]
    max_attempts: Option<usize>,
}

fn default_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

impl From<RawPollPolicy> for PollPolicy {
    fn from(raw: RawPollPolicy) -> Self {
        Self {
            interval: Duration::from_secs(raw.interval_secs),
            max_attempts: raw.max_attempts,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub fn bounded(interval: Duration, max_attempts: usize) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }

    /// No delay between attempts.
    pub fn immediate() -> Self {
        Self::unbounded(Duration::ZERO)
    }

    fn exhausted(&self, attempts: usize) -> bool {
        self.max_attempts.map_or(false, |max| attempts >= max)
    }
}

/// Send the request built by `build_request` until the response status is
/// something other than `pending_status`, and return that response.
///
/// Transport errors end the poll immediately. Non-success statuses other than
/// `pending_status` are returned to the caller as-is.
pub async fn poll_reqwest<F>(
    build_request: F,
    pending_status: StatusCode,
    policy: PollPolicy,
) -> Result<Response>
where
    F: Fn() -> Result<RequestBuilder> + Send + Sync,
{
    let counter = AtomicUsize::new(0);
    let op = || async {
        let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let request = build_request().map_err(backoff::Error::Permanent)?;
        let response = request
            .send()
            .await
            .with_context(|| format!("poll attempt {} failed", attempt))
            .map_err(backoff::Error::Permanent)?;

        if response.status() != pending_status {
            return Ok(response);
        }

        if policy.exhausted(attempt) {
            return Err(backoff::Error::Permanent(anyhow!(
                "still pending after {} attempts",
                attempt
            )));
        }

        Err(backoff::Error::transient(anyhow!(
            "poll attempt {} returned {}",
            attempt,
            pending_status
        )))
    };

    retry_notify(
        Constant::new(policy.interval),
        op,
        |err: anyhow::Error, dur: Duration| debug!("{}, polling again in {:?}", err, dur),
    )
    .await
}

#[async_trait]
pub trait PollRetry {
    async fn poll_until_ready(
        self,
        pending_status: StatusCode,
        policy: PollPolicy,
    ) -> Result<Response>;

    async fn poll_until_ready_default(self) -> Result<Response>;
}

#[async_trait]
impl PollRetry for RequestBuilder {
    async fn poll_until_ready_default(self) -> Result<Response> {
        self.poll_until_ready(PENDING_STATUS, PollPolicy::default())
            .await
    }

    async fn poll_until_ready(
        self,
        pending_status: StatusCode,
        policy: PollPolicy,
    ) -> Result<Response> {
        poll_reqwest(
            || {
                self.try_clone().ok_or_else(|| {
                    anyhow::Error::msg("This request cannot be polled because it cannot be cloned")
                })
            },
            pending_status,
            policy,
        )
        .await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn pending_then_ready(pending: u64) -> MockServer {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/job"))
            .respond_with(ResponseTemplate::new(202))
            .up_to_n_times(pending)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/job"))
            .respond_with(ResponseTemplate::new(200).set_body_string("done"))
            .mount(&server)
            .await;

        server
    }

    #[tokio::test]
    async fn poll_should_wait_for_ready() -> Result<()> {
        let server = pending_then_ready(3).await;

        let response = reqwest::Client::new()
            .get(format!("{}/job", server.uri()))
            .poll_until_ready(PENDING_STATUS, PollPolicy::immediate())
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await?, "done");

        let requests = server.received_requests().await.unwrap_or_default();
        assert_eq!(requests.len(), 4);

        Ok(())
    }

    #[tokio::test]
    async fn poll_should_stop_at_attempt_budget() -> Result<()> {
        let server = pending_then_ready(10).await;

        let result = reqwest::Client::new()
            .get(format!("{}/job", server.uri()))
            .poll_until_ready(PENDING_STATUS, PollPolicy::bounded(Duration::ZERO, 2))
            .await;

        match result {
            Err(err) => assert!(format!("{:?}", err).contains("still pending after 2 attempts")),
            Ok(response) => anyhow::bail!("expected poll to give up, got {}", response.status()),
        }

        Ok(())
    }

    #[tokio::test]
    async fn poll_should_return_error_statuses() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/job"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let response = reqwest::Client::new()
            .get(format!("{}/job", server.uri()))
            .poll_until_ready(PENDING_STATUS, PollPolicy::immediate())
            .await?;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        Ok(())
    }

    #[tokio::test]
    async fn poll_should_fail_on_transport_error() -> Result<()> {
        let invalid_url = "http://127.0.0.1:81/job";
        let result = reqwest::Client::new()
            .get(invalid_url)
            .poll_until_ready(PENDING_STATUS, PollPolicy::immediate())
            .await;

        if let Err(err) = &result {
            assert!(format!("{:?}", err).contains("poll attempt 1 failed"));
        } else {
            anyhow::bail!("response to {} was expected to fail", invalid_url);
        }

        Ok(())
    }

    #[test]
    fn policy_from_json() -> Result<()> {
        let policy: PollPolicy =
            serde_json::from_str(r#"{"interval_secs": 2, "max_attempts": 7}"#)?;
        assert_eq!(policy, PollPolicy::bounded(Duration::from_secs(2), 7));

        let policy: PollPolicy = serde_json::from_str("{}")?;
        assert_eq!(policy, PollPolicy::default());

        Ok(())
    }
}

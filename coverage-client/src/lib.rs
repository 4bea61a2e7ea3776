// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! # coverage-client
//!
//! Typed access to the code coverage backend: per-path coverage, coverage
//! history, platform/suite filters, the zero-coverage report artifact and
//! changeset summaries, plus the raw sources and revision mappings the front
//! ends need around them.
//!
//! Responses for the cacheable requests are kept in a [`FetchCache`] owned by
//! the [`CoverageClient`] instance. See the cache docs for its eviction rule.

#[macro_use]
extern crate log;

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use cache::FetchCache;
pub use client::CoverageClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use reqwest_retry::PollPolicy;
pub use types::{
    ChangesetSummary, FileRecord, Filters, HistoryPoint, LineCoverage, RecordType,
    ZeroCoverageReport, ALL, REV_LATEST,
};

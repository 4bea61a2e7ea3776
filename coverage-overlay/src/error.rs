// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use coverage_client::ClientError;
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum OverlayError {
    /// The coverage fetch failed. Shared by every waiter of the same fetch.
    #[error(transparent)]
    Client(#[from] Arc<ClientError>),

    #[error("no 'coverage' field")]
    MissingCoverage,

    #[error("unknown line number element")]
    UnknownLineElements,

    /// The page did not yield a revision and path to overlay.
    #[error("unable to resolve page target: {0}")]
    Resolve(String),
}

impl From<ClientError> for OverlayError {
    fn from(err: ClientError) -> Self {
        OverlayError::Client(Arc::new(err))
    }
}

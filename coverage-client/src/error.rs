// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("{status} - {status_text}")]
    Request { status: u16, status_text: String },

    /// The response decoded, but a field the caller needs is absent.
    #[error("no '{0}' field in response")]
    MissingData(&'static str),

    #[error("unexpected response body: {0}")]
    Malformed(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Poll(#[from] anyhow::Error),
}

impl ClientError {
    pub fn from_status(status: StatusCode) -> Self {
        ClientError::Request {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Request { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, Result};

#[async_trait]
pub trait ResponseExt: Sized {
    /// Alternative to `Response::error_for_status()` which keeps the status
    /// code and reason as structured data.
    fn error_for_status_typed(self) -> Result<Self>;

    /// Check the status, then decode the body as JSON.
    async fn json_checked<T: DeserializeOwned + Send>(self) -> Result<T>;

    /// Check the status, then return the body as text.
    async fn text_checked(self) -> Result<String>;
}

#[async_trait]
impl ResponseExt for Response {
    fn error_for_status_typed(self) -> Result<Self> {
        let status = self.status();

        if !status.is_success() {
            return Err(ClientError::from_status(status));
        }

        Ok(self)
    }

    async fn json_checked<T: DeserializeOwned + Send>(self) -> Result<T> {
        let response = self.error_for_status_typed()?;
        let data = response.json().await?;
        Ok(data)
    }

    async fn text_checked(self) -> Result<String> {
        let response = self.error_for_status_typed()?;
        let text = response.text().await?;
        Ok(text)
    }
}

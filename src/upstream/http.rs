use super::{UpstreamError, UpstreamResult};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Shared GET-and-decode plumbing of the upstream clients.
pub(super) struct UpstreamHttp {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamHttp {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GETs `path` (relative to the base url) and decodes the JSON body. `what` names the
    /// requested entity in error messages.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> UpstreamResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::Unavailable(format!("failed to fetch {}: {}", what, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            return Err(UpstreamError::Unavailable(format!(
                "fetching {} returned status {}",
                what, status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| UpstreamError::Unavailable(format!("malformed {} response: {}", what, e)))
    }
}

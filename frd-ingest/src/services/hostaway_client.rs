//! Primary provider HTTP client
//!
//! Thin wrapper over a shared `reqwest::Client`. Every provider response is
//! wrapped in a `{status, result}` envelope; only `status == "success"` counts.

use serde::Deserialize;
use std::time::Duration;

use super::{CredentialManager, UpstreamError};

const USER_AGENT: &str = concat!("frd-ingest/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

/// Primary provider API client
#[derive(Debug, Clone)]
pub struct HostawayClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HostawayClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Underlying HTTP client, shared with the credential exchange
    pub fn http(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Absolute URL for a provider path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a Bearer-authenticated resource and unwrap its `result`
    pub async fn get_result(
        &self,
        path: &str,
        token: &str,
    ) -> Result<serde_json::Value, UpstreamError> {
        let url = self.url(path);
        tracing::debug!(url = %url, "Querying review provider");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status(status.as_u16(), error_text));
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;

        match envelope.status.as_deref() {
            Some("success") => Ok(envelope.result.unwrap_or(serde_json::Value::Null)),
            other => Err(UpstreamError::Parse(format!(
                "unexpected envelope status: {}",
                other.unwrap_or("<missing>")
            ))),
        }
    }

    /// `get_result`, renewing `token` once if the provider rejects it
    ///
    /// On return `token` holds the token that was last sent.
    pub async fn get_authorized(
        &self,
        path: &str,
        credentials: &CredentialManager,
        token: &mut String,
    ) -> Result<serde_json::Value, UpstreamError> {
        match self.get_result(path, token).await {
            Err(UpstreamError::Status(401, body)) => {
                tracing::warn!(path = path, body = %body, "Access token rejected, renewing");
                *token = credentials.renew(token).await?;
                self.get_result(path, token).await
            }
            other => other,
        }
    }
}

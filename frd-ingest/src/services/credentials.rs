//! Credential manager
//!
//! Acquires and caches the review provider's OAuth access token through a
//! client-credentials exchange. Where the token lives is a construction-time
//! choice of [`TokenStore`]: process memory, or a JSON file that survives
//! restarts.
//!
//! Concurrent callers that find the token absent or stale share one exchange.
//! The first caller takes `refresh_lock` and refreshes; the rest wait on the
//! lock and then find the fresh token on their re-check.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use frd_common::config::HostawayConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::UpstreamError;

/// Tokens are refreshed this long before they actually expire
const REFRESH_BUFFER_SECS: i64 = 60;

/// Cached provider access token
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    value: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, issued_at: DateTime<Utc>, lifetime_secs: i64) -> Self {
        Self {
            value: value.into(),
            issued_at,
            expires_at: issued_at + Duration::seconds(lifetime_secs.max(0)),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Usable at `now`, leaving the refresh buffer
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(REFRESH_BUFFER_SECS)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Storage for the current access token
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Option<AccessToken>;
    async fn set(&self, token: AccessToken);
    async fn clear(&self);
}

/// Process-lifetime token storage
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Option<AccessToken> {
        self.token.read().await.clone()
    }

    async fn set(&self, token: AccessToken) {
        *self.token.write().await = Some(token);
    }

    async fn clear(&self) {
        *self.token.write().await = None;
    }
}

/// Token storage persisted as a JSON file
///
/// Unreadable or corrupt files read as "no token"; write failures are logged
/// and otherwise ignored, leaving the next call to exchange again.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> Option<AccessToken> {
        let bytes = tokio::fs::read(&self.path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt token cache file");
                None
            }
        }
    }

    async fn set(&self, token: AccessToken) {
        let bytes = match serde_json::to_vec(&token) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to serialize access token");
                return;
            }
        };

        if let Some(parent) = self.path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(path = %parent.display(), error = %e, "Failed to create token cache directory");
                return;
            }
        }

        if let Err(e) = tokio::fs::write(&self.path, bytes).await {
            warn!(path = %self.path.display(), error = %e, "Failed to write token cache file");
        }
    }

    async fn clear(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove token cache file"),
        }
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: i64,
}

/// Single-flight access token provider
pub struct CredentialManager {
    http_client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    store: Arc<dyn TokenStore>,
    refresh_lock: Mutex<()>,
}

impl CredentialManager {
    pub fn new(
        config: &HostawayConfig,
        http_client: reqwest::Client,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            http_client,
            token_url: format!("{}/accessTokens", config.base_url.trim_end_matches('/')),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Current access token, exchanging for a new one when needed
    pub async fn get_token(&self) -> Result<String, UpstreamError> {
        if let Some(value) = self.cached_value().await {
            return Ok(value);
        }

        let _guard = self.refresh_lock.lock().await;

        // Refreshed by whoever held the lock before us
        if let Some(value) = self.cached_value().await {
            debug!("Access token refreshed by a concurrent caller");
            return Ok(value);
        }

        self.exchange_and_store().await
    }

    /// Replace a token the provider rejected
    ///
    /// Callers holding the same rejected token share one exchange: once the
    /// stored token differs from `rejected`, it is returned as is.
    pub async fn renew(&self, rejected: &str) -> Result<String, UpstreamError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(value) = self.cached_value().await {
            if value != rejected {
                debug!("Rejected access token already replaced");
                return Ok(value);
            }
        }

        self.store.clear().await;
        self.exchange_and_store().await
    }

    /// Caller must hold `refresh_lock`
    async fn exchange_and_store(&self) -> Result<String, UpstreamError> {
        let token = self.exchange().await?;
        debug!(expires_at = %token.expires_at(), "Storing access token");
        let value = token.value.clone();
        self.store.set(token).await;
        Ok(value)
    }

    async fn cached_value(&self) -> Option<String> {
        self.store
            .get()
            .await
            .filter(|token| token.is_fresh_at(Utc::now()))
            .map(|token| token.value)
    }

    async fn exchange(&self) -> Result<AccessToken, UpstreamError> {
        if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
            return Err(UpstreamError::Authentication(
                "client credentials are not configured".to_string(),
            ));
        }

        debug!(url = %self.token_url, client_id = %self.client_id, "Exchanging client credentials");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.token_url, error = %e, "Token endpoint unreachable");
                UpstreamError::Authentication(format!("token endpoint unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Token exchange rejected");
            return Err(UpstreamError::Authentication(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Malformed token response");
            UpstreamError::Authentication(format!("malformed token response: {}", e))
        })?;

        info!(
            token_type = token.token_type.as_deref().unwrap_or("unknown"),
            expires_in = token.expires_in,
            "Access token acquired"
        );

        Ok(AccessToken::new(token.access_token, Utc::now(), token.expires_in))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(client_id: &str) -> HostawayConfig {
        HostawayConfig {
            // Nothing listens on the discard port
            base_url: "http://127.0.0.1:9".to_string(),
            client_id: client_id.to_string(),
            client_secret: "secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_freshness_respects_buffer() {
        let issued = Utc::now();
        let token = AccessToken::new("abc", issued, 120);
        assert!(token.is_fresh_at(issued));
        assert!(token.is_fresh_at(issued + Duration::seconds(59)));
        assert!(!token.is_fresh_at(issued + Duration::seconds(60)));
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = AccessToken::new("super-secret", Utc::now(), 3600);
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_cached_token_skips_exchange() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set(AccessToken::new("cached", Utc::now(), 3600)).await;

        let manager = CredentialManager::new(&config("61148"), reqwest::Client::new(), store);
        assert_eq!(manager.get_token().await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn test_stale_token_with_unreachable_endpoint_fails() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set(AccessToken::new("stale", Utc::now(), 30)).await;

        let manager = CredentialManager::new(&config("61148"), reqwest::Client::new(), store);
        let err = manager.get_token().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_without_network() {
        let manager = CredentialManager::new(
            &config(""),
            reqwest::Client::new(),
            Arc::new(MemoryTokenStore::new()),
        );
        let err = manager.get_token().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");
        let token = AccessToken::new("persisted", Utc::now(), 3600);

        FileTokenStore::new(&path).set(token.clone()).await;
        let reloaded = FileTokenStore::new(&path).get().await;
        assert_eq!(reloaded, Some(token));

        FileTokenStore::new(&path).clear().await;
        assert_eq!(FileTokenStore::new(&path).get().await, None);
    }

    #[tokio::test]
    async fn test_file_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").unwrap();

        assert_eq!(FileTokenStore::new(&path).get().await, None);
    }
}

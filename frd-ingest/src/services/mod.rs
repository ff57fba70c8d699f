//! Upstream services
//!
//! Credential management, provider connectors and the merged review feed.
//! Connectors absorb upstream failures and fall back to local data; only the
//! credential manager surfaces errors to its callers.

pub mod credentials;
pub mod hostaway_client;
pub mod listings_connector;
pub mod places_connector;
pub mod review_feed;
pub mod reviews_connector;
pub mod seed;
pub mod ttl_cache;

pub use credentials::{AccessToken, CredentialManager, FileTokenStore, MemoryTokenStore, TokenStore};
pub use hostaway_client::HostawayClient;
pub use listings_connector::ListingsConnector;
pub use places_connector::PlacesConnector;
pub use review_feed::ReviewFeed;
pub use reviews_connector::ReviewsConnector;

use thiserror::Error;

/// Upstream call errors
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream error {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl UpstreamError {
    /// True for a 404 from the upstream
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::Status(404, _))
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            UpstreamError::Parse(e.to_string())
        } else {
            UpstreamError::Unavailable(e.to_string())
        }
    }
}

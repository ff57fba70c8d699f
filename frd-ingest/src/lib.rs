//! frd-ingest library interface
//!
//! Review ingestion, normalization and query service. Exposes the router and
//! shared state for the binary and for integration tests.

pub mod api;
pub mod approvals;
pub mod error;
pub mod identity;
pub mod normalize;
pub mod query;
pub mod raw;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use frd_common::config::TomlConfig;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::approvals::{ApprovalStore, MemoryApprovalStore, SqliteApprovalStore};
use crate::services::{
    seed, CredentialManager, FileTokenStore, HostawayClient, ListingsConnector,
    MemoryTokenStore, PlacesConnector, ReviewFeed, ReviewsConnector, TokenStore,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialManager>,
    pub feed: Arc<ReviewFeed>,
    pub listings: Arc<ListingsConnector>,
    pub approvals: Arc<dyn ApprovalStore>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire every component from configuration
    ///
    /// Selects the persistent token store when `hostaway.token_cache_path`
    /// is set and the SQLite approval store when `approvals.database_path`
    /// is set; otherwise both live in process memory.
    pub async fn from_config(config: &TomlConfig) -> frd_common::Result<Self> {
        let startup_time = Utc::now();
        let timeout = Duration::from_secs(config.upstream.timeout_secs);

        let client = HostawayClient::new(&config.hostaway.base_url, timeout)
            .map_err(|e| frd_common::Error::Internal(e.to_string()))?;

        let token_store: Arc<dyn TokenStore> = match &config.hostaway.token_cache_path {
            Some(path) => {
                info!("Access tokens cached in {}", path.display());
                Arc::new(FileTokenStore::new(path))
            }
            None => Arc::new(MemoryTokenStore::new()),
        };
        let credentials = Arc::new(CredentialManager::new(
            &config.hostaway,
            client.http().clone(),
            token_store,
        ));

        let reviews = Arc::new(ReviewsConnector::new(
            client.clone(),
            Arc::clone(&credentials),
            seed::seed_reviews(startup_time),
        ));
        let listings = Arc::new(ListingsConnector::new(client, Arc::clone(&credentials)));
        let places = Arc::new(
            PlacesConnector::new(&config.places, timeout)
                .map_err(|e| frd_common::Error::Internal(e.to_string()))?,
        );
        let feed = Arc::new(ReviewFeed::new(reviews, places, config.places.sources.clone()));

        let approvals: Arc<dyn ApprovalStore> = match &config.approvals.database_path {
            Some(path) => Arc::new(SqliteApprovalStore::connect(path).await?),
            None => Arc::new(MemoryApprovalStore::new()),
        };

        Ok(Self {
            credentials,
            feed,
            listings,
            approvals,
            startup_time,
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::review_routes())
        .merge(api::listing_routes())
        .merge(api::auth_routes())
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

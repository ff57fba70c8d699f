//! HTTP API handlers for frd-ingest

pub mod auth;
pub mod health;
pub mod listings;
pub mod reviews;

pub use auth::auth_routes;
pub use health::health_routes;
pub use listings::listing_routes;
pub use reviews::review_routes;

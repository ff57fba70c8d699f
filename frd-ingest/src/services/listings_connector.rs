//! Primary provider listings connector
//!
//! "No listings" is a valid state: every failure degrades to an empty result.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::{CredentialManager, HostawayClient};
use crate::raw::{decode_records, HostawayListing};

pub struct ListingsConnector {
    client: HostawayClient,
    credentials: Arc<CredentialManager>,
}

impl ListingsConnector {
    pub fn new(client: HostawayClient, credentials: Arc<CredentialManager>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// All listings, in provider order
    pub async fn fetch(&self) -> Vec<HostawayListing> {
        let Some(mut token) = self.token().await else {
            return Vec::new();
        };

        match self
            .client
            .get_authorized("listings", &self.credentials, &mut token)
            .await
        {
            Ok(serde_json::Value::Array(values)) => {
                let listings: Vec<HostawayListing> = decode_records(values, "listing");
                info!(count = listings.len(), "Fetched upstream listings");
                listings
            }
            Ok(_) => {
                warn!("Listings endpoint returned a non-array result");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Listings endpoint failed");
                Vec::new()
            }
        }
    }

    /// One listing by provider id
    pub async fn fetch_by_id(&self, id: i64) -> Option<HostawayListing> {
        let mut token = self.token().await?;
        let path = format!("listings/{}", id);

        match self
            .client
            .get_authorized(&path, &self.credentials, &mut token)
            .await
        {
            Ok(value) if value.is_object() => match serde_json::from_value(value) {
                Ok(listing) => Some(listing),
                Err(e) => {
                    warn!(listing_id = id, error = %e, "Malformed listing record");
                    None
                }
            },
            Ok(_) => None,
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                warn!(listing_id = id, error = %e, "Listing lookup failed");
                None
            }
        }
    }

    async fn token(&self) -> Option<String> {
        match self.credentials.get_token().await {
            Ok(token) => Some(token),
            Err(e) => {
                error!(error = %e, "Listing provider authentication failed");
                None
            }
        }
    }
}

//! Primary provider reviews connector
//!
//! The provider is inconsistent about which path serves reviews, so a short
//! ordered list of candidates is tried. A 404 moves on to the next candidate
//! and the first non-empty result wins. Whatever comes back is merged with the
//! seed set; nothing here ever fails the caller.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{CredentialManager, HostawayClient, UpstreamError};
use crate::raw::{decode_records, HostawayReview, RawReview};

/// Candidate review endpoints, in order
pub const REVIEW_ENDPOINTS: [&str; 2] = ["reviews", "listings/reviews"];

pub struct ReviewsConnector {
    client: HostawayClient,
    credentials: Arc<CredentialManager>,
    seed: Vec<HostawayReview>,
}

impl ReviewsConnector {
    pub fn new(
        client: HostawayClient,
        credentials: Arc<CredentialManager>,
        seed: Vec<HostawayReview>,
    ) -> Self {
        Self {
            client,
            credentials,
            seed,
        }
    }

    /// Upstream reviews plus any seed reviews the upstream did not return
    pub async fn fetch(&self) -> Vec<RawReview> {
        let upstream = self.fetch_upstream().await;
        merge_with_seed(upstream, &self.seed)
    }

    async fn fetch_upstream(&self) -> Vec<HostawayReview> {
        let mut token = match self.credentials.get_token().await {
            Ok(token) => token,
            Err(e) => {
                error!(error = %e, "Review provider authentication failed, serving seed reviews");
                return Vec::new();
            }
        };

        for endpoint in REVIEW_ENDPOINTS {
            match self
                .client
                .get_authorized(endpoint, &self.credentials, &mut token)
                .await
            {
                Ok(serde_json::Value::Array(values)) => {
                    let reviews: Vec<HostawayReview> = decode_records(values, "review");
                    if !reviews.is_empty() {
                        info!(endpoint = endpoint, count = reviews.len(), "Fetched upstream reviews");
                        return reviews;
                    }
                    debug!(endpoint = endpoint, "Review endpoint returned no reviews");
                }
                Ok(_) => {
                    warn!(endpoint = endpoint, "Review endpoint returned a non-array result");
                }
                Err(e) if e.is_not_found() => {
                    debug!(endpoint = endpoint, "Review endpoint not found, trying next");
                }
                Err(UpstreamError::Authentication(e)) => {
                    error!(endpoint = endpoint, error = %e, "Token renewal failed, serving seed reviews");
                    return Vec::new();
                }
                Err(e) => {
                    warn!(endpoint = endpoint, error = %e, "Review endpoint failed");
                }
            }
        }

        warn!("No upstream reviews available, serving seed reviews only");
        Vec::new()
    }
}

/// Upstream records followed by seed records whose id upstream lacks
///
/// Identifier-based set membership only: an upstream record always wins over
/// a seed record with the same id.
pub fn merge_with_seed(upstream: Vec<HostawayReview>, seed: &[HostawayReview]) -> Vec<RawReview> {
    let upstream: Vec<RawReview> = upstream.into_iter().map(RawReview::Hostaway).collect();
    let known: HashSet<i64> = upstream.iter().filter_map(RawReview::native_id).collect();

    let missing = seed
        .iter()
        .filter(|review| !known.contains(&review.id))
        .cloned()
        .map(RawReview::Seed);

    upstream.into_iter().chain(missing).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: i64, guest: &str) -> HostawayReview {
        HostawayReview {
            id,
            guest_name: Some(guest.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_upstream_wins_on_shared_id() {
        let upstream = vec![review(2, "upstream"), review(5, "upstream")];
        let seed = vec![review(1, "seed"), review(2, "seed"), review(3, "seed")];

        let merged = merge_with_seed(upstream, &seed);
        let ids: Vec<i64> = merged.iter().filter_map(RawReview::native_id).collect();
        assert_eq!(ids, vec![2, 5, 1, 3]);

        match &merged[0] {
            RawReview::Hostaway(r) => assert_eq!(r.guest_name.as_deref(), Some("upstream")),
            other => panic!("expected upstream record, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_with_empty_upstream_is_seed() {
        let seed = vec![review(1, "seed"), review(2, "seed")];
        let merged = merge_with_seed(Vec::new(), &seed);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|r| matches!(r, RawReview::Seed(_))));
    }
}

//! Merged review feed
//!
//! Runs the primary connector and every configured place source
//! concurrently, then normalizes the combined raw records. The connectors
//! touch disjoint upstream state, so nothing here needs coordination beyond
//! the connectors' own caches.

use frd_common::config::PlaceSource;
use frd_common::models::CanonicalReview;
use futures::future::join_all;
use std::sync::Arc;
use tracing::debug;

use super::{PlacesConnector, ReviewsConnector};
use crate::normalize::normalize_all;
use crate::raw::RawReview;

pub struct ReviewFeed {
    reviews: Arc<ReviewsConnector>,
    places: Arc<PlacesConnector>,
    place_sources: Vec<PlaceSource>,
}

impl ReviewFeed {
    pub fn new(
        reviews: Arc<ReviewsConnector>,
        places: Arc<PlacesConnector>,
        place_sources: Vec<PlaceSource>,
    ) -> Self {
        Self {
            reviews,
            places,
            place_sources,
        }
    }

    pub fn places(&self) -> &PlacesConnector {
        &self.places
    }

    /// Primary provider and seed reviews, normalized
    pub async fn primary(&self) -> Vec<CanonicalReview> {
        normalize_all(self.reviews.fetch().await)
    }

    /// Primary, seed and configured place reviews, normalized
    pub async fn all(&self) -> Vec<CanonicalReview> {
        let place_fetches = self
            .place_sources
            .iter()
            .map(|source| self.places.fetch_for_listing(&source.place_id, &source.listing_name));

        let (mut raws, place_batches): (Vec<RawReview>, Vec<Vec<RawReview>>) =
            tokio::join!(self.reviews.fetch(), join_all(place_fetches));

        for batch in place_batches {
            raws.extend(batch);
        }

        debug!(
            count = raws.len(),
            place_sources = self.place_sources.len(),
            "Collected raw reviews"
        );
        normalize_all(raws)
    }
}

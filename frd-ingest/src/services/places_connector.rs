//! Alternate-channel (place reviews) connector
//!
//! Reviews are keyed by place id and cached for a configurable TTL, since the
//! upstream is rate limited. A cache hit never touches the network. A missing
//! API key degrades to "no reviews from this channel".

use frd_common::config::PlacesConfig;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::ttl_cache::TtlCache;
use super::UpstreamError;
use crate::raw::{decode_records, PlaceReview, RawReview};

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    result: Option<DetailsResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    #[serde(default)]
    reviews: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    status: String,
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    place_id: String,
}

pub struct PlacesConnector {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache: TtlCache<String, Vec<PlaceReview>>,
}

impl PlacesConnector {
    pub fn new(config: &PlacesConfig, timeout: Duration) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;

        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            cache: TtlCache::new(Duration::from_secs(config.cache_ttl_secs)),
        })
    }

    /// Reviews for one place, from cache when fresh
    pub async fn fetch(&self, place_id: &str) -> Vec<PlaceReview> {
        let key = place_id.to_string();
        if let Some(reviews) = self.cache.get(&key).await {
            debug!(place_id = %place_id, count = reviews.len(), "Place reviews served from cache");
            return reviews;
        }

        let Some(api_key) = self.api_key.as_deref() else {
            warn!(place_id = %place_id, "Places API key not configured, skipping place reviews");
            return Vec::new();
        };

        match self
            .cache
            .get_or_try_fill(key, || self.fetch_details(place_id, api_key))
            .await
        {
            Ok(reviews) => reviews,
            Err(e) => {
                warn!(place_id = %place_id, error = %e, "Place reviews unavailable");
                Vec::new()
            }
        }
    }

    /// Place reviews tagged with the listing they belong to
    pub async fn fetch_for_listing(&self, place_id: &str, listing_name: &str) -> Vec<RawReview> {
        self.fetch(place_id)
            .await
            .into_iter()
            .map(|review| RawReview::Places {
                place_id: place_id.to_string(),
                listing_name: listing_name.to_string(),
                review,
            })
            .collect()
    }

    /// Resolve an address or name to a place id; first candidate wins
    pub async fn find_place_id(&self, text: &str) -> Option<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Places API key not configured, cannot search places");
            return None;
        };

        match self.search(text, api_key).await {
            Ok(place_id) => place_id,
            Err(e) => {
                warn!(query = %text, error = %e, "Place search failed");
                None
            }
        }
    }

    async fn fetch_details(
        &self,
        place_id: &str,
        api_key: &str,
    ) -> Result<Vec<PlaceReview>, UpstreamError> {
        let url = format!("{}/details/json", self.base_url);
        debug!(place_id = %place_id, "Querying place details");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("place_id", place_id),
                ("fields", "name,reviews"),
                ("key", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status(status.as_u16(), error_text));
        }

        let details: DetailsResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;

        match details.status.as_str() {
            "OK" => {
                let values = details.result.map(|r| r.reviews).unwrap_or_default();
                let reviews: Vec<PlaceReview> = decode_records(values, "place review");
                info!(place_id = %place_id, count = reviews.len(), "Fetched place reviews");
                Ok(reviews)
            }
            "ZERO_RESULTS" => {
                debug!(place_id = %place_id, "Place has no reviews");
                Ok(Vec::new())
            }
            other => Err(UpstreamError::Unavailable(format!(
                "place details status {}: {}",
                other,
                details.error_message.unwrap_or_default()
            ))),
        }
    }

    async fn search(&self, text: &str, api_key: &str) -> Result<Option<String>, UpstreamError> {
        let url = format!("{}/findplacefromtext/json", self.base_url);
        debug!(query = %text, "Searching places");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("input", text),
                ("inputtype", "textquery"),
                ("fields", "place_id"),
                ("key", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status(status.as_u16(), error_text));
        }

        let found: FindResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;

        match found.status.as_str() {
            "OK" => Ok(found.candidates.into_iter().next().map(|c| c.place_id)),
            "ZERO_RESULTS" => Ok(None),
            other => Err(UpstreamError::Unavailable(format!(
                "place search status {}: {}",
                other,
                found.error_message.unwrap_or_default()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config(api_key: Option<&str>) -> PlacesConfig {
        PlacesConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: api_key.map(str::to_string),
            ..Default::default()
        }
    }

    fn review(time: i64) -> PlaceReview {
        PlaceReview {
            author_name: Some("Ana".to_string()),
            rating: Some(5.0),
            text: None,
            time,
            relative_time_description: None,
        }
    }

    #[tokio::test]
    async fn test_missing_key_yields_no_reviews() {
        let connector = PlacesConnector::new(&unreachable_config(None), Duration::from_secs(1)).unwrap();
        assert!(connector.fetch("ChIJ123").await.is_empty());
        assert_eq!(connector.find_place_id("Putney").await, None);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let connector =
            PlacesConnector::new(&unreachable_config(Some("key")), Duration::from_secs(1)).unwrap();
        connector
            .cache
            .insert("ChIJ123".to_string(), vec![review(1), review(2)])
            .await;

        let raws = connector.fetch_for_listing("ChIJ123", "The Putney Apart").await;
        assert_eq!(raws.len(), 2);
        assert!(matches!(
            &raws[0],
            RawReview::Places { listing_name, .. } if listing_name == "The Putney Apart"
        ));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_degrades_to_empty() {
        let connector =
            PlacesConnector::new(&unreachable_config(Some("key")), Duration::from_secs(1)).unwrap();
        assert!(connector.fetch("ChIJ123").await.is_empty());
    }
}

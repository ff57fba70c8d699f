//! Provider record shapes
//!
//! These mirror what each upstream actually sends. Every optional field is
//! lenient: absent or null values deserialize to `None` and are defaulted
//! during normalization, never rejected here.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Review as sent by the primary provider (and by the local seed set)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostawayReview {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub review_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub public_review: Option<String>,
    #[serde(default)]
    pub review_category: Option<Vec<HostawayCategory>>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub guest_name: Option<String>,
    #[serde(default)]
    pub listing_name: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HostawayCategory {
    pub category: String,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// Listing as sent by the primary provider
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostawayListing {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub internal_listing_name: Option<String>,
    #[serde(default)]
    pub external_listing_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub public_address: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub bedrooms_number: Option<u32>,
    #[serde(default)]
    pub bathrooms_number: Option<u32>,
    #[serde(default)]
    pub person_capacity: Option<u32>,
    #[serde(default)]
    pub listing_amenities: Option<Vec<HostawayAmenity>>,
    #[serde(default)]
    pub listing_images: Option<Vec<HostawayImage>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostawayAmenity {
    #[serde(default)]
    pub amenity_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostawayImage {
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

/// Review as sent by the alternate channel's place-details endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaceReview {
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
    /// Unix seconds
    pub time: i64,
    #[serde(default)]
    pub relative_time_description: Option<String>,
}

/// Any provider record that can become a canonical review
#[derive(Debug, Clone, PartialEq)]
pub enum RawReview {
    Hostaway(HostawayReview),
    Seed(HostawayReview),
    Places {
        place_id: String,
        listing_name: String,
        review: PlaceReview,
    },
}

impl RawReview {
    /// Provider-native id, where one exists
    pub fn native_id(&self) -> Option<i64> {
        match self {
            RawReview::Hostaway(r) | RawReview::Seed(r) => Some(r.id),
            RawReview::Places { .. } => None,
        }
    }
}

/// Decode each array element independently, skipping the malformed ones
///
/// One bad record in an upstream page must not discard the rest.
pub fn decode_records<T>(values: Vec<serde_json::Value>, kind: &str) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
{
    let total = values.len();
    let decoded: Vec<T> = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<T>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(kind = kind, error = %e, "Skipping malformed upstream record");
                None
            }
        })
        .collect();

    if decoded.len() < total {
        warn!(
            kind = kind,
            kept = decoded.len(),
            skipped = total - decoded.len(),
            "Upstream page contained malformed records"
        );
    }
    decoded
}

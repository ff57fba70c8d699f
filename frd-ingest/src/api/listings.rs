//! Listing endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use frd_common::models::ListingRecord;
use serde::Serialize;
use tracing::debug;

use crate::identity::{parse_listing_id, resolve_listing, to_slug};
use crate::normalize::normalize_listing;
use crate::{ApiError, ApiResult, AppState};

const DEFAULT_NAME: &str = "Property";
const DEFAULT_ADDRESS: &str = "Address not available";
const DEFAULT_AMENITIES: [&str; 2] = ["WiFi", "Kitchen"];
const DEFAULT_BEDROOMS: u32 = 0;
const DEFAULT_BATHROOMS: u32 = 1;
const DEFAULT_GUESTS: u32 = 2;

/// All listings in canonical form, provider order
pub(crate) async fn canonical_listings(state: &AppState) -> Vec<ListingRecord> {
    state
        .listings
        .fetch()
        .await
        .into_iter()
        .map(normalize_listing)
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Listing with its derived identity fields
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    #[serde(flatten)]
    pub listing: ListingRecord,
    pub canonical_name: Option<String>,
    pub slug: String,
}

impl From<ListingRecord> for ListingSummary {
    fn from(listing: ListingRecord) -> Self {
        let canonical_name = listing.canonical_name().map(str::to_string);
        let slug = canonical_name.as_deref().map(to_slug).unwrap_or_default();
        Self {
            listing,
            canonical_name,
            slug,
        }
    }
}

/// Listing plus the display fields a property page needs, with defaults
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetail {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub address: String,
    pub description: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub guests: u32,
    pub amenities: Vec<String>,
    /// Ascending by sort order
    pub images: Vec<String>,
    pub listing: ListingRecord,
}

impl PropertyDetail {
    pub fn from_listing(listing: ListingRecord) -> Self {
        let name = listing.canonical_name().unwrap_or(DEFAULT_NAME).to_string();
        let slug = listing.canonical_name().map(to_slug).unwrap_or_default();

        let address = non_empty(listing.public_address.as_deref())
            .or_else(|| non_empty(listing.address.as_deref()))
            .map(str::to_string)
            .or_else(|| {
                let parts: Vec<&str> = [&listing.street, &listing.city, &listing.country]
                    .into_iter()
                    .filter_map(|part| non_empty(part.as_deref()))
                    .collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            })
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        let description = non_empty(listing.description.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "Beautiful property in {}.",
                    non_empty(listing.city.as_deref()).unwrap_or("the area")
                )
            });

        let amenities = match &listing.amenities {
            Some(set) => set.iter().cloned().collect(),
            None => DEFAULT_AMENITIES.iter().map(|a| a.to_string()).collect(),
        };

        let images = listing.images.iter().map(|img| img.url.clone()).collect();

        Self {
            id: listing.id,
            name,
            slug,
            address,
            description,
            bedrooms: listing.bedrooms.unwrap_or(DEFAULT_BEDROOMS),
            bathrooms: listing.bathrooms.unwrap_or(DEFAULT_BATHROOMS),
            guests: listing.person_capacity.unwrap_or(DEFAULT_GUESTS),
            amenities,
            images,
            listing,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListingsResponse {
    pub status: &'static str,
    pub result: Vec<ListingSummary>,
}

#[derive(Debug, Serialize)]
pub struct ListingDetailResponse {
    pub status: &'static str,
    pub result: PropertyDetail,
}

/// GET /listings
pub async fn list_listings(State(state): State<AppState>) -> Json<ListingsResponse> {
    let result = canonical_listings(&state)
        .await
        .into_iter()
        .map(ListingSummary::from)
        .collect();

    Json(ListingsResponse {
        status: "success",
        result,
    })
}

/// GET /listings/:identifier
///
/// Accepts a numeric id, a display name or a slug.
pub async fn get_listing(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<ListingDetailResponse>> {
    let listings = canonical_listings(&state).await;

    let listing = match resolve_listing(&identifier, &listings) {
        Some(found) => Some(found.clone()),
        None => match parse_listing_id(&identifier) {
            Some(id) => {
                debug!(listing_id = id, "Listing not in bulk set, fetching by id");
                state.listings.fetch_by_id(id).await.map(normalize_listing)
            }
            None => None,
        },
    }
    .ok_or_else(|| ApiError::NotFound(format!("Listing not found: {}", identifier)))?;

    Ok(Json(ListingDetailResponse {
        status: "success",
        result: PropertyDetail::from_listing(listing),
    }))
}

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/listings", get(list_listings))
        .route("/listings/:identifier", get(get_listing))
}

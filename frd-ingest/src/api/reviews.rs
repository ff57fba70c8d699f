//! Review endpoints
//!
//! Query parameters are validated before any connector runs, so a malformed
//! request never costs an upstream call.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use frd_common::models::{CanonicalReview, ReviewDirection, ReviewStatus};
use frd_common::time::{parse_end_bound, parse_start_bound};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::listings::canonical_listings;
use crate::approvals::decision_map;
use crate::identity::listing_name_matches;
use crate::normalize::normalize_all;
use crate::query::{
    apply_approvals, distinct_channels, property_rollup, query, sort_reviews, summarize,
    trending_issues, CategoryIssue, PropertyStats, ReviewCriteria, ReviewSummary, SortKey,
    SortOrder, SortSpec,
};
use crate::{ApiError, ApiResult, AppState};

/// Treat empty query values as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_rating(name: &str, value: Option<&str>) -> ApiResult<Option<f64>> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("{} must be a number, got {:?}", name, raw))),
    }
}

/// Filter and sort parameters shared by `/reviews` and `/reviews/stats`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub listing: Option<String>,
    pub channel: Option<String>,
    #[serde(rename = "type")]
    pub review_type: Option<String>,
    pub status: Option<String>,
    pub min_rating: Option<String>,
    pub max_rating: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ReviewQuery {
    pub fn criteria(&self) -> ApiResult<ReviewCriteria> {
        let direction = present(&self.review_type)
            .map(|v| {
                ReviewDirection::parse(v)
                    .ok_or_else(|| ApiError::BadRequest(format!("Unknown review type: {}", v)))
            })
            .transpose()?;

        let status = present(&self.status)
            .map(|v| {
                ReviewStatus::parse(v)
                    .ok_or_else(|| ApiError::BadRequest(format!("Unknown review status: {}", v)))
            })
            .transpose()?;

        let start = present(&self.start_date)
            .map(|v| {
                parse_start_bound(v)
                    .ok_or_else(|| ApiError::BadRequest(format!("Invalid startDate: {}", v)))
            })
            .transpose()?;

        let end = present(&self.end_date)
            .map(|v| {
                parse_end_bound(v)
                    .ok_or_else(|| ApiError::BadRequest(format!("Invalid endDate: {}", v)))
            })
            .transpose()?;

        Ok(ReviewCriteria {
            listing: present(&self.listing).map(str::to_string),
            channel: present(&self.channel).map(str::to_string),
            direction,
            status,
            min_rating: parse_rating("minRating", present(&self.min_rating))?,
            max_rating: parse_rating("maxRating", present(&self.max_rating))?,
            category: present(&self.category).map(str::to_string),
            start,
            end,
        })
    }

    pub fn sort(&self) -> ApiResult<SortSpec> {
        let key = match present(&self.sort_by) {
            None => SortKey::default(),
            Some(v) => SortKey::parse(v)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown sortBy: {}", v)))?,
        };
        let order = match present(&self.sort_order) {
            None => SortOrder::default(),
            Some(v) => SortOrder::parse(v)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown sortOrder: {}", v)))?,
        };
        Ok(SortSpec { key, order })
    }
}

/// All reviews with moderation decisions applied
async fn joined_reviews(state: &AppState) -> ApiResult<Vec<CanonicalReview>> {
    let reviews = state.feed.all().await;
    let decisions = decision_map(state.approvals.as_ref()).await?;
    Ok(apply_approvals(reviews, &decisions))
}

#[derive(Debug, Serialize)]
pub struct ReviewsResponse {
    pub status: &'static str,
    pub result: Vec<CanonicalReview>,
    pub total: usize,
    pub listings: Vec<String>,
    pub channels: Vec<String>,
}

/// GET /reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(params): Query<ReviewQuery>,
) -> ApiResult<Json<ReviewsResponse>> {
    let criteria = params.criteria()?;
    let sort = params.sort()?;

    let (reviews, listings) = tokio::join!(joined_reviews(&state), canonical_listings(&state));
    let reviews = reviews?;

    let mut listing_names: Vec<String> = listings
        .iter()
        .filter_map(|l| l.canonical_name())
        .map(str::to_string)
        .collect();
    if listing_names.is_empty() {
        // No listing data upstream; offer the names reviews carry instead
        listing_names = reviews.iter().map(|r| r.listing_name.clone()).collect();
    }
    listing_names.sort();
    listing_names.dedup();

    let channels = distinct_channels(&reviews);
    let result = query(&reviews, &criteria, sort);

    Ok(Json(ReviewsResponse {
        status: "success",
        total: result.len(),
        result,
        listings: listing_names,
        channels,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub status: &'static str,
    pub summary: ReviewSummary,
    pub trending_issues: Vec<CategoryIssue>,
    pub properties: Vec<PropertyStats>,
}

/// GET /reviews/stats
pub async fn review_stats(
    State(state): State<AppState>,
    Query(params): Query<ReviewQuery>,
) -> ApiResult<Json<StatsResponse>> {
    let criteria = params.criteria()?;
    let reviews = joined_reviews(&state).await?;
    let selected = query(&reviews, &criteria, SortSpec::default());

    Ok(Json(StatsResponse {
        status: "success",
        summary: summarize(&selected),
        trending_issues: trending_issues(&selected),
        properties: property_rollup(&selected),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuery {
    pub listing_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublicReviewsResponse {
    pub reviews: Vec<CanonicalReview>,
}

/// GET /reviews/public
///
/// Published reviews only. Once any moderation decision exists, only
/// reviews explicitly approved are shown.
pub async fn public_reviews(
    State(state): State<AppState>,
    Query(params): Query<PublicQuery>,
) -> ApiResult<Json<PublicReviewsResponse>> {
    let search = present(&params.listing_name).map(str::to_string);

    let reviews = state.feed.primary().await;
    let decisions = decision_map(state.approvals.as_ref()).await?;
    let moderated = !decisions.is_empty();

    let mut visible: Vec<CanonicalReview> = apply_approvals(reviews, &decisions)
        .into_iter()
        .filter(|r| r.status == ReviewStatus::Published)
        .filter(|r| !moderated || decisions.get(&r.id) == Some(&true))
        .filter(|r| {
            search
                .as_deref()
                .map_or(true, |s| listing_name_matches(&r.listing_name, s))
        })
        .collect();
    sort_reviews(&mut visible, SortSpec::default());

    Ok(Json(PublicReviewsResponse { reviews: visible }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacesQuery {
    pub place_id: Option<String>,
    pub address: Option<String>,
    pub listing_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlacesResponse {
    pub status: &'static str,
    pub result: Vec<CanonicalReview>,
    pub total: usize,
}

/// GET /reviews/places
pub async fn place_reviews(
    State(state): State<AppState>,
    Query(params): Query<PlacesQuery>,
) -> ApiResult<Json<PlacesResponse>> {
    let listing_name = present(&params.listing_name);

    let place_id = match (present(&params.place_id), present(&params.address)) {
        (Some(id), _) => id.to_string(),
        (None, Some(address)) => {
            let search = match listing_name {
                Some(name) => format!("{}, {}", name, address),
                None => address.to_string(),
            };
            state.feed.places().find_place_id(&search).await.ok_or_else(|| {
                ApiError::NotFound(format!("No place found for address: {}", address))
            })?
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Either placeId or address must be provided".to_string(),
            ))
        }
    };

    let raws = state
        .feed
        .places()
        .fetch_for_listing(&place_id, listing_name.unwrap_or_default())
        .await;
    let decisions = decision_map(state.approvals.as_ref()).await?;
    let mut result = apply_approvals(normalize_all(raws), &decisions);
    sort_reviews(&mut result, SortSpec::default());

    Ok(Json(PlacesResponse {
        status: "success",
        total: result.len(),
        result,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub review_id: i64,
    #[serde(default)]
    pub listing_name: Option<String>,
    pub approved: bool,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub success: bool,
}

/// POST /reviews/approve
pub async fn approve_review(
    State(state): State<AppState>,
    body: Result<Json<ApproveRequest>, JsonRejection>,
) -> ApiResult<Json<ApproveResponse>> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let record = state
        .approvals
        .upsert(
            request.review_id,
            request.listing_name.as_deref().unwrap_or_default(),
            request.approved,
        )
        .await?;

    info!(
        review_id = record.review_id,
        approved = record.approved,
        listing = %record.listing_name,
        "Review moderation decision stored"
    );

    Ok(Json(ApproveResponse { success: true }))
}

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", get(list_reviews))
        .route("/reviews/stats", get(review_stats))
        .route("/reviews/public", get(public_reviews))
        .route("/reviews/places", get(place_reviews))
        .route("/reviews/approve", post(approve_review))
}

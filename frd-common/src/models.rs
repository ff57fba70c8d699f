//! Canonical data model
//!
//! Every provider record is converted into these shapes before it reaches
//! filtering, statistics or the HTTP boundary. Wire names follow the review
//! provider's vocabulary (`type`, `rating`, `reviewCategory`, ...) so the
//! presentation layer consumes one schema regardless of origin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Who reviewed whom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewDirection {
    GuestToHost,
    HostToGuest,
}

impl ReviewDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDirection::GuestToHost => "guest-to-host",
            ReviewDirection::HostToGuest => "host-to-guest",
        }
    }

    /// Strict parse of the wire value
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "guest-to-host" => Some(ReviewDirection::GuestToHost),
            "host-to-guest" => Some(ReviewDirection::HostToGuest),
            _ => None,
        }
    }
}

/// Provider-side publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Published,
    Pending,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Published => "published",
            ReviewStatus::Pending => "pending",
            ReviewStatus::Rejected => "rejected",
        }
    }

    /// Strict parse of the wire value
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "published" => Some(ReviewStatus::Published),
            "pending" => Some(ReviewStatus::Pending),
            "rejected" => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }
}

/// Which connector produced a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSource {
    /// Primary review provider
    Hostaway,
    /// Alternate channel (place reviews)
    Places,
    /// Local seed set
    Seed,
}

impl ReviewSource {
    /// Approval state used when no moderation decision exists
    ///
    /// The alternate channel has no private moderation upstream, so its
    /// reviews start approved. Everything else starts unapproved.
    pub fn default_approval(&self) -> bool {
        matches!(self, ReviewSource::Places)
    }
}

/// One per-category score, in provider order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRating {
    pub category: String,
    #[serde(rename = "rating")]
    pub score: f64,
}

impl CategoryRating {
    pub fn new(category: impl Into<String>, score: f64) -> Self {
        Self {
            category: category.into(),
            score,
        }
    }
}

/// Highest value of the canonical rating scale
pub const MAX_RATING: f64 = 5.0;

/// Round to one decimal place
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Canonical rating for a review
///
/// A direct overall rating wins; otherwise the arithmetic mean of the
/// category scores; otherwise 0. Rounded to one decimal and clamped to
/// `[0, MAX_RATING]`.
pub fn average_rating(raw_rating: Option<f64>, categories: &[CategoryRating]) -> f64 {
    let value = match raw_rating {
        Some(rating) if rating.is_finite() => rating,
        _ if !categories.is_empty() => {
            let sum: f64 = categories.iter().map(|c| c.score).sum();
            sum / categories.len() as f64
        }
        _ => 0.0,
    };

    if !value.is_finite() {
        return 0.0;
    }
    round_one_decimal(value).clamp(0.0, MAX_RATING)
}

/// Field values for building a [`CanonicalReview`]
#[derive(Debug, Clone)]
pub struct ReviewParts {
    pub id: i64,
    pub direction: ReviewDirection,
    pub status: ReviewStatus,
    pub raw_rating: Option<f64>,
    pub category_ratings: Vec<CategoryRating>,
    pub public_review: String,
    pub submitted_at: DateTime<Utc>,
    pub guest_name: String,
    pub listing_name: String,
    pub channel: String,
    pub source: ReviewSource,
}

/// A review in the canonical schema
///
/// The rating fields are private: `averageRating` is derived from `rating`
/// and `reviewCategory` and is recomputed on every change to them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalReview {
    pub id: i64,
    #[serde(rename = "type")]
    pub direction: ReviewDirection,
    pub status: ReviewStatus,
    #[serde(rename = "rating")]
    raw_rating: Option<f64>,
    pub public_review: String,
    #[serde(rename = "reviewCategory")]
    category_ratings: Vec<CategoryRating>,
    #[serde(rename = "averageRating")]
    computed_average_rating: f64,
    pub submitted_at: DateTime<Utc>,
    pub guest_name: String,
    /// Free text as supplied by the provider, not a listing id
    pub listing_name: String,
    pub channel: String,
    pub source: ReviewSource,
    #[serde(rename = "isApproved")]
    pub approval_state: bool,
}

impl CanonicalReview {
    pub fn new(parts: ReviewParts) -> Self {
        let computed_average_rating = average_rating(parts.raw_rating, &parts.category_ratings);
        Self {
            id: parts.id,
            direction: parts.direction,
            status: parts.status,
            raw_rating: parts.raw_rating,
            public_review: parts.public_review,
            category_ratings: parts.category_ratings,
            computed_average_rating,
            submitted_at: parts.submitted_at,
            guest_name: parts.guest_name,
            listing_name: parts.listing_name,
            channel: parts.channel,
            source: parts.source,
            approval_state: parts.source.default_approval(),
        }
    }

    pub fn raw_rating(&self) -> Option<f64> {
        self.raw_rating
    }

    pub fn category_ratings(&self) -> &[CategoryRating] {
        &self.category_ratings
    }

    pub fn average_rating(&self) -> f64 {
        self.computed_average_rating
    }

    /// Replace the rating inputs and recompute the canonical rating
    pub fn set_ratings(&mut self, raw_rating: Option<f64>, category_ratings: Vec<CategoryRating>) {
        self.computed_average_rating = average_rating(raw_rating, &category_ratings);
        self.raw_rating = raw_rating;
        self.category_ratings = category_ratings;
    }

    /// Copy of this review with the given approval state
    pub fn with_approval(mut self, approved: bool) -> Self {
        self.approval_state = approved;
        self
    }
}

/// Listing photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingImage {
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
    pub sort_order: i64,
}

/// A property listing in the canonical schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub id: i64,
    pub internal_name: Option<String>,
    pub public_name: Option<String>,
    pub external_name: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub address: Option<String>,
    pub public_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub zipcode: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub person_capacity: Option<u32>,
    /// `None` when the provider omitted the amenity list entirely
    pub amenities: Option<BTreeSet<String>>,
    /// Ascending by `sort_order`
    pub images: Vec<ListingImage>,
}

impl ListingRecord {
    /// Candidate display names in precedence order
    pub fn name_candidates(&self) -> [Option<&str>; 3] {
        [
            self.internal_name.as_deref(),
            self.public_name.as_deref(),
            self.external_name.as_deref(),
        ]
    }

    /// First non-empty of internal, public and external name
    pub fn canonical_name(&self) -> Option<&str> {
        self.name_candidates()
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
    }
}

/// Stored moderation decision for one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    pub review_id: i64,
    /// Informational only, last non-empty value written
    pub listing_name: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

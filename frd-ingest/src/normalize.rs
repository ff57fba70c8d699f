//! Normalization engine
//!
//! Converts any provider record into the canonical review or listing shape.
//! Pure functions: no I/O, and no failure path. Malformed optional fields
//! degrade to defaults.
//!
//! Each provider shape is first mapped into one intermediate representation
//! ([`Draft`]); the shared rating-scale and channel rules then apply to every
//! provider identically.

use chrono::{DateTime, Utc};
use frd_common::models::{
    CanonicalReview, CategoryRating, ListingImage, ListingRecord, ReviewDirection, ReviewParts,
    ReviewSource, ReviewStatus, MAX_RATING,
};
use frd_common::time::{from_unix_seconds, parse_provider_timestamp};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::raw::{HostawayListing, HostawayReview, PlaceReview, RawReview};

/// Channel label for primary-provider reviews that do not declare one
pub const HOSTAWAY_CHANNEL: &str = "Hostaway";
/// Channel label for alternate-channel reviews
pub const PLACES_CHANNEL: &str = "Google";

const ANONYMOUS_GUEST: &str = "Anonymous";
const UNKNOWN_LISTING: &str = "Unknown Property";

/// Synthesized ids live in [2^52, 2^53): exact in JSON numbers and above any
/// id the primary provider hands out.
const SYNTHETIC_ID_BASE: u64 = 1 << 52;

/// Intermediate representation shared by all providers
struct Draft {
    id: i64,
    direction: ReviewDirection,
    status: ReviewStatus,
    raw_rating: Option<f64>,
    categories: Vec<CategoryRating>,
    text: String,
    submitted_at: DateTime<Utc>,
    guest_name: String,
    listing_name: String,
    channel: Option<String>,
    source: ReviewSource,
}

/// Convert a provider record into a canonical review
pub fn normalize(raw: RawReview) -> CanonicalReview {
    let draft = match raw {
        RawReview::Hostaway(review) => from_hostaway(review, ReviewSource::Hostaway),
        RawReview::Seed(review) => from_hostaway(review, ReviewSource::Seed),
        RawReview::Places {
            place_id,
            listing_name,
            review,
        } => from_place(&place_id, listing_name, review),
    };
    finish(draft)
}

/// Normalize a batch, preserving order
pub fn normalize_all(raws: Vec<RawReview>) -> Vec<CanonicalReview> {
    raws.into_iter().map(normalize).collect()
}

fn from_hostaway(review: HostawayReview, source: ReviewSource) -> Draft {
    let categories = review
        .review_category
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| {
            let score = c.rating.filter(|s| s.is_finite())?;
            Some(CategoryRating::new(c.category, score))
        })
        .collect();

    Draft {
        id: review.id,
        direction: review
            .review_type
            .as_deref()
            .and_then(ReviewDirection::parse)
            .unwrap_or(ReviewDirection::GuestToHost),
        status: review
            .status
            .as_deref()
            .and_then(ReviewStatus::parse)
            .unwrap_or(ReviewStatus::Pending),
        raw_rating: review.rating.filter(|r| r.is_finite()),
        categories,
        text: review.public_review.unwrap_or_default(),
        submitted_at: review
            .submitted_at
            .as_deref()
            .and_then(parse_provider_timestamp)
            .unwrap_or_default(),
        guest_name: non_empty(review.guest_name).unwrap_or_else(|| ANONYMOUS_GUEST.to_string()),
        listing_name: non_empty(review.listing_name)
            .unwrap_or_else(|| UNKNOWN_LISTING.to_string()),
        channel: review.channel,
        source,
    }
}

fn from_place(place_id: &str, listing_name: String, review: PlaceReview) -> Draft {
    Draft {
        id: place_review_id(place_id, review.time),
        direction: ReviewDirection::GuestToHost,
        status: ReviewStatus::Published,
        raw_rating: review.rating.filter(|r| r.is_finite()),
        categories: Vec::new(),
        text: review.text.unwrap_or_default(),
        submitted_at: from_unix_seconds(review.time).unwrap_or_default(),
        guest_name: non_empty(review.author_name).unwrap_or_else(|| ANONYMOUS_GUEST.to_string()),
        listing_name: non_empty(Some(listing_name)).unwrap_or_else(|| UNKNOWN_LISTING.to_string()),
        channel: Some(PLACES_CHANNEL.to_string()),
        source: ReviewSource::Places,
    }
}

fn finish(draft: Draft) -> CanonicalReview {
    let (raw_rating, categories) = to_five_point_scale(draft.raw_rating, draft.categories);
    let channel = non_empty(draft.channel).unwrap_or_else(|| default_channel(draft.source).to_string());

    CanonicalReview::new(ReviewParts {
        id: draft.id,
        direction: draft.direction,
        status: draft.status,
        raw_rating,
        category_ratings: categories,
        public_review: draft.text,
        submitted_at: draft.submitted_at,
        guest_name: draft.guest_name,
        listing_name: draft.listing_name,
        channel,
        source: draft.source,
    })
}

fn default_channel(source: ReviewSource) -> &'static str {
    match source {
        ReviewSource::Hostaway | ReviewSource::Seed => HOSTAWAY_CHANNEL,
        ReviewSource::Places => PLACES_CHANNEL,
    }
}

/// Bring provider ratings onto the canonical 0-5 scale
///
/// The primary provider reports category scores out of 10 for some review
/// types. A review with any category score above 5 is treated as 10-point and
/// all of its category scores are halved; a raw rating above 5 is halved the
/// same way.
fn to_five_point_scale(
    raw_rating: Option<f64>,
    categories: Vec<CategoryRating>,
) -> (Option<f64>, Vec<CategoryRating>) {
    let ten_point = categories.iter().any(|c| c.score > MAX_RATING);
    let categories = if ten_point {
        categories
            .into_iter()
            .map(|c| CategoryRating::new(c.category, c.score / 2.0))
            .collect()
    } else {
        categories
    };

    let raw_rating = raw_rating.map(|r| if r > MAX_RATING { r / 2.0 } else { r });
    (raw_rating, categories)
}

/// Deterministic id for an alternate-channel review
///
/// Derived from the place id and the review's native timestamp, so refetching
/// the same upstream review always yields the same canonical id.
pub fn place_review_id(place_id: &str, time: i64) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(place_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(time.to_be_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let folded = u64::from_be_bytes(prefix) & (SYNTHETIC_ID_BASE - 1);
    (SYNTHETIC_ID_BASE | folded) as i64
}

/// Convert a provider listing into the canonical listing shape
pub fn normalize_listing(raw: HostawayListing) -> ListingRecord {
    let amenities = raw.listing_amenities.map(|list| {
        list.into_iter()
            .filter_map(|a| non_empty(a.amenity_name))
            .collect::<BTreeSet<_>>()
    });

    let mut images: Vec<ListingImage> = raw
        .listing_images
        .unwrap_or_default()
        .into_iter()
        .filter(|img| !img.url.trim().is_empty())
        .map(|img| ListingImage {
            url: img.url,
            caption: img.caption,
            sort_order: img.sort_order,
        })
        .collect();
    // Stable: equal sort orders keep provider order
    images.sort_by_key(|img| img.sort_order);

    ListingRecord {
        id: raw.id,
        internal_name: non_empty(raw.internal_listing_name),
        public_name: non_empty(raw.name),
        external_name: non_empty(raw.external_listing_name),
        description: non_empty(raw.description),
        thumbnail_url: non_empty(raw.thumbnail_url),
        address: non_empty(raw.address),
        public_address: non_empty(raw.public_address),
        street: non_empty(raw.street),
        city: non_empty(raw.city),
        country: non_empty(raw.country),
        zipcode: non_empty(raw.zipcode),
        bedrooms: raw.bedrooms_number,
        bathrooms: raw.bathrooms_number,
        person_capacity: raw.person_capacity,
        amenities,
        images,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

//! Local seed reviews
//!
//! Served alongside (or instead of) upstream reviews. The fixed set ships as
//! JSON in the provider's own shape; the showcase set for the demo listing is
//! generated with dates relative to a reference instant so it always looks
//! recent.

use chrono::{DateTime, Duration, Utc};
use tracing::error;

use crate::raw::{decode_records, HostawayCategory, HostawayReview};

const FIXED_SEED: &str = include_str!("../../data/seed_reviews.json");

/// Listing the generated showcase reviews belong to
pub const SHOWCASE_LISTING: &str = "The Putney Apart";

struct ShowcaseReview {
    id: i64,
    days_ago: i64,
    rating: f64,
    guest: &'static str,
    text: &'static str,
    /// cleanliness, communication, location, value
    scores: [f64; 4],
}

const SHOWCASE_CATEGORIES: [&str; 4] = ["cleanliness", "communication", "location", "value"];

const SHOWCASE: [ShowcaseReview; 5] = [
    ShowcaseReview {
        id: 10001,
        days_ago: 5,
        rating: 5.0,
        guest: "Sarah Mitchell",
        text: "Absolutely fantastic stay! The Putney Apart was spotless, beautifully furnished, and in a perfect location. The host was incredibly responsive and helpful throughout our stay. Would definitely book again!",
        scores: [5.0, 5.0, 5.0, 5.0],
    },
    ShowcaseReview {
        id: 10002,
        days_ago: 12,
        rating: 4.8,
        guest: "James Anderson",
        text: "Wonderful apartment with great amenities. The location is perfect - close to transport and local shops. The apartment was very clean and well-maintained. Highly recommend!",
        scores: [5.0, 5.0, 5.0, 4.0],
    },
    ShowcaseReview {
        id: 10003,
        days_ago: 20,
        rating: 4.5,
        guest: "Emily Thompson",
        text: "Great stay at The Putney Apart! The apartment is modern and comfortable. The check-in process was smooth and the host provided excellent communication. The area is lovely with plenty of restaurants nearby.",
        scores: [4.0, 5.0, 5.0, 4.0],
    },
    ShowcaseReview {
        id: 10004,
        days_ago: 30,
        rating: 5.0,
        guest: "Robert Martinez",
        text: "Perfect apartment for our stay in London! The Putney Apart exceeded our expectations. Everything was clean, well-organized, and the host was very accommodating. The location is excellent with easy access to central London.",
        scores: [5.0, 5.0, 5.0, 5.0],
    },
    ShowcaseReview {
        id: 10005,
        days_ago: 45,
        rating: 4.7,
        guest: "Lisa Chen",
        text: "Lovely apartment with a great view! The Putney Apart is well-equipped and comfortable. The host was very helpful and responsive. The neighborhood is quiet and safe. Would stay here again!",
        scores: [5.0, 5.0, 4.0, 5.0],
    },
];

/// The fixed seed reviews bundled with the binary
pub fn fixed_reviews() -> Vec<HostawayReview> {
    match serde_json::from_str::<Vec<serde_json::Value>>(FIXED_SEED) {
        Ok(values) => decode_records(values, "seed review"),
        Err(e) => {
            error!(error = %e, "Bundled seed reviews are not a JSON array");
            Vec::new()
        }
    }
}

/// Showcase reviews dated relative to `now`
pub fn showcase_reviews(now: DateTime<Utc>) -> Vec<HostawayReview> {
    SHOWCASE
        .iter()
        .map(|s| HostawayReview {
            id: s.id,
            review_type: Some("guest-to-host".to_string()),
            status: Some("published".to_string()),
            rating: Some(s.rating),
            public_review: Some(s.text.to_string()),
            review_category: Some(
                SHOWCASE_CATEGORIES
                    .iter()
                    .zip(s.scores)
                    .map(|(category, score)| HostawayCategory {
                        category: category.to_string(),
                        rating: Some(score),
                    })
                    .collect(),
            ),
            submitted_at: Some(
                (now - Duration::days(s.days_ago))
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
            ),
            guest_name: Some(s.guest.to_string()),
            listing_name: Some(SHOWCASE_LISTING.to_string()),
            channel: Some("Hostaway".to_string()),
        })
        .collect()
}

/// Complete seed set: fixed reviews followed by the showcase reviews
pub fn seed_reviews(now: DateTime<Utc>) -> Vec<HostawayReview> {
    let mut reviews = fixed_reviews();
    reviews.extend(showcase_reviews(now));
    reviews
}

//! Review filtering, sorting and derived statistics
//!
//! Everything here is a pure function over its inputs and returns new
//! collections; reviews passed in are never modified.

use chrono::{DateTime, Utc};
use frd_common::models::{round_one_decimal, CanonicalReview, ReviewDirection, ReviewStatus};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// How many categories the trending-issues view reports
pub const TRENDING_ISSUE_LIMIT: usize = 3;

/// Review filter; every criterion is optional and all present ones must hold
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewCriteria {
    /// Exact match against the review's listing name
    pub listing: Option<String>,
    pub channel: Option<String>,
    pub direction: Option<ReviewDirection>,
    pub status: Option<ReviewStatus>,
    /// Inclusive, on the canonical rating
    pub min_rating: Option<f64>,
    /// Inclusive, on the canonical rating
    pub max_rating: Option<f64>,
    /// At least one category score with this name
    pub category: Option<String>,
    /// Inclusive lower bound on submission time
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on submission time
    pub end: Option<DateTime<Utc>>,
}

impl ReviewCriteria {
    pub fn matches(&self, review: &CanonicalReview) -> bool {
        let rating = review.average_rating();

        self.listing.as_deref().map_or(true, |l| review.listing_name == l)
            && self.channel.as_deref().map_or(true, |c| review.channel == c)
            && self.direction.map_or(true, |d| review.direction == d)
            && self.status.map_or(true, |s| review.status == s)
            && self.min_rating.map_or(true, |min| rating >= min)
            && self.max_rating.map_or(true, |max| rating <= max)
            && self.category.as_deref().map_or(true, |c| {
                review.category_ratings().iter().any(|cat| cat.category == c)
            })
            && self.start.map_or(true, |start| review.submitted_at >= start)
            && self.end.map_or(true, |end| review.submitted_at <= end)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Date,
    Rating,
    Listing,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" => Some(SortKey::Date),
            "rating" => Some(SortKey::Rating),
            "listing" => Some(SortKey::Listing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Sort specification; defaults to newest first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

fn compare(a: &CanonicalReview, b: &CanonicalReview, key: SortKey) -> Ordering {
    match key {
        SortKey::Date => a.submitted_at.cmp(&b.submitted_at),
        SortKey::Rating => a.average_rating().total_cmp(&b.average_rating()),
        SortKey::Listing => a
            .listing_name
            .to_lowercase()
            .cmp(&b.listing_name.to_lowercase())
            .then_with(|| a.listing_name.cmp(&b.listing_name)),
    }
}

/// Stable sort: equal keys keep their input order in both directions
pub fn sort_reviews(reviews: &mut [CanonicalReview], sort: SortSpec) {
    reviews.sort_by(|a, b| {
        let ordering = compare(a, b, sort.key);
        match sort.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// Filtered, sorted copy of `reviews`
pub fn query(reviews: &[CanonicalReview], criteria: &ReviewCriteria, sort: SortSpec) -> Vec<CanonicalReview> {
    let mut selected: Vec<CanonicalReview> = reviews
        .iter()
        .filter(|review| criteria.matches(review))
        .cloned()
        .collect();
    sort_reviews(&mut selected, sort);
    selected
}

/// Left-join moderation decisions; reviews without one keep their default
pub fn apply_approvals(reviews: Vec<CanonicalReview>, decisions: &HashMap<i64, bool>) -> Vec<CanonicalReview> {
    reviews
        .into_iter()
        .map(|review| match decisions.get(&review.id) {
            Some(&approved) => review.with_approval(approved),
            None => review,
        })
        .collect()
}

/// Distinct channel labels, sorted
pub fn distinct_channels(reviews: &[CanonicalReview]) -> Vec<String> {
    reviews
        .iter()
        .map(|review| review.channel.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub total_reviews: usize,
    pub average_rating: f64,
    pub approved_count: usize,
    pub pending_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryIssue {
    pub category: String,
    pub average_rating: f64,
    pub review_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyStats {
    pub listing_name: String,
    pub total_reviews: usize,
    pub average_rating: f64,
    pub approved_count: usize,
    pub pending_count: usize,
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub fn summarize(reviews: &[CanonicalReview]) -> ReviewSummary {
    let sum: f64 = reviews.iter().map(CanonicalReview::average_rating).sum();
    ReviewSummary {
        total_reviews: reviews.len(),
        average_rating: round_one_decimal(mean(sum, reviews.len())),
        approved_count: reviews.iter().filter(|r| r.approval_state).count(),
        pending_count: reviews
            .iter()
            .filter(|r| r.status == ReviewStatus::Pending)
            .count(),
    }
}

/// The lowest-scoring categories, ascending by mean score
///
/// Ties keep first-seen category order.
pub fn trending_issues(reviews: &[CanonicalReview]) -> Vec<CategoryIssue> {
    // (category, sum, count) in first-seen order
    let mut groups: Vec<(String, f64, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for rating in reviews.iter().flat_map(|r| r.category_ratings()) {
        match index.get(&rating.category) {
            Some(&i) => {
                groups[i].1 += rating.score;
                groups[i].2 += 1;
            }
            None => {
                index.insert(rating.category.clone(), groups.len());
                groups.push((rating.category.clone(), rating.score, 1));
            }
        }
    }

    let mut issues: Vec<(f64, CategoryIssue)> = groups
        .into_iter()
        .map(|(category, sum, count)| {
            let exact = mean(sum, count);
            (
                exact,
                CategoryIssue {
                    category,
                    average_rating: round_one_decimal(exact),
                    review_count: count,
                },
            )
        })
        .collect();

    issues.sort_by(|a, b| a.0.total_cmp(&b.0));
    issues
        .into_iter()
        .take(TRENDING_ISSUE_LIMIT)
        .map(|(_, issue)| issue)
        .collect()
}

/// Per-listing statistics, descending by mean rating
///
/// Groups are keyed by the review's free-text listing name; ties keep
/// first-seen order.
pub fn property_rollup(reviews: &[CanonicalReview]) -> Vec<PropertyStats> {
    struct Group {
        listing_name: String,
        sum: f64,
        count: usize,
        approved: usize,
        pending: usize,
    }

    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for review in reviews {
        let i = *index.entry(review.listing_name.as_str()).or_insert_with(|| {
            groups.push(Group {
                listing_name: review.listing_name.clone(),
                sum: 0.0,
                count: 0,
                approved: 0,
                pending: 0,
            });
            groups.len() - 1
        });

        let group = &mut groups[i];
        group.sum += review.average_rating();
        group.count += 1;
        if review.approval_state {
            group.approved += 1;
        }
        if review.status == ReviewStatus::Pending {
            group.pending += 1;
        }
    }

    groups.sort_by(|a, b| mean(b.sum, b.count).total_cmp(&mean(a.sum, a.count)));
    groups
        .into_iter()
        .map(|g| PropertyStats {
            average_rating: round_one_decimal(mean(g.sum, g.count)),
            listing_name: g.listing_name,
            total_reviews: g.count,
            approved_count: g.approved,
            pending_count: g.pending,
        })
        .collect()
}

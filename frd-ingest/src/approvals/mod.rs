//! Moderation decision storage
//!
//! One [`ApprovalRecord`] per review ever judged, keyed by review id. Upsert
//! is last-write-wins on `approved`; `updated_at` never moves backwards and
//! `created_at` never changes. There is no delete.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryApprovalStore;
pub use sqlite::SqliteApprovalStore;

use async_trait::async_trait;
use frd_common::models::ApprovalRecord;
use frd_common::Result;
use std::collections::HashMap;

/// Listing name stored when a first decision arrives without one
pub const UNKNOWN_LISTING_NAME: &str = "Unknown";

/// Optional constraints for [`ApprovalStore::list_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApprovalFilter {
    pub approved: Option<bool>,
}

impl ApprovalFilter {
    pub fn approved_only() -> Self {
        Self {
            approved: Some(true),
        }
    }

    pub fn matches(&self, record: &ApprovalRecord) -> bool {
        self.approved.map_or(true, |approved| record.approved == approved)
    }
}

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Create or update the decision for `review_id`
    ///
    /// An empty `listing_name` leaves the stored name untouched.
    async fn upsert(&self, review_id: i64, listing_name: &str, approved: bool) -> Result<ApprovalRecord>;

    /// All decisions matching `filter`, ascending by review id
    async fn list_all(&self, filter: ApprovalFilter) -> Result<Vec<ApprovalRecord>>;
}

/// Review id to decision, for joining against reviews
pub async fn decision_map(store: &dyn ApprovalStore) -> Result<HashMap<i64, bool>> {
    let records = store.list_all(ApprovalFilter::default()).await?;
    Ok(records
        .into_iter()
        .map(|record| (record.review_id, record.approved))
        .collect())
}

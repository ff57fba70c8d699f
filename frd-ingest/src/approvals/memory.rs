//! Process-lifetime approval store

use async_trait::async_trait;
use chrono::Utc;
use frd_common::models::ApprovalRecord;
use frd_common::Result;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{ApprovalFilter, ApprovalStore, UNKNOWN_LISTING_NAME};

/// In-memory approval store
///
/// The whole read-modify-write of an upsert happens under the write lock, so
/// concurrent upserts to one review id never lose an update.
#[derive(Debug, Default)]
pub struct MemoryApprovalStore {
    records: RwLock<BTreeMap<i64, ApprovalRecord>>,
}

impl MemoryApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApprovalStore for MemoryApprovalStore {
    async fn upsert(&self, review_id: i64, listing_name: &str, approved: bool) -> Result<ApprovalRecord> {
        let now = Utc::now();
        let listing_name = listing_name.trim();
        let mut records = self.records.write().await;

        let record = match records.entry(review_id) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                record.approved = approved;
                if !listing_name.is_empty() {
                    record.listing_name = listing_name.to_string();
                }
                record.updated_at = record.updated_at.max(now);
                record.clone()
            }
            Entry::Vacant(entry) => {
                let name = if listing_name.is_empty() {
                    UNKNOWN_LISTING_NAME
                } else {
                    listing_name
                };
                entry
                    .insert(ApprovalRecord {
                        review_id,
                        listing_name: name.to_string(),
                        approved,
                        created_at: now,
                        updated_at: now,
                    })
                    .clone()
            }
        };

        tracing::debug!(review_id = review_id, approved = approved, "Approval recorded");
        Ok(record)
    }

    async fn list_all(&self, filter: ApprovalFilter) -> Result<Vec<ApprovalRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }
}

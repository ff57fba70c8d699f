//! SQLite-backed approval store
//!
//! Same contract as the in-memory store. The upsert is a single
//! `INSERT ... ON CONFLICT DO UPDATE` statement, which SQLite executes
//! atomically. Timestamps are stored as fixed-width RFC 3339 text so that
//! `MAX()` on the column is chronological.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use frd_common::models::ApprovalRecord;
use frd_common::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use tracing::info;

use super::{ApprovalFilter, ApprovalStore, UNKNOWN_LISTING_NAME};

pub struct SqliteApprovalStore {
    pool: SqlitePool,
}

impl SqliteApprovalStore {
    /// Open (creating if needed) the database file at `path`
    pub async fn connect(path: &Path) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true),
            )
            .await?;

        info!("Approval database opened at {}", path.display());
        Self::new(pool).await
    }

    /// Wrap an existing pool, creating the table if missing
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS review_approvals (
                review_id INTEGER PRIMARY KEY,
                listing_name TEXT NOT NULL,
                approved INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Corrupt approval timestamp {:?}: {}", value, e)))
}

fn record_from_row(row: &SqliteRow) -> Result<ApprovalRecord> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(ApprovalRecord {
        review_id: row.try_get("review_id")?,
        listing_name: row.try_get("listing_name")?,
        approved: row.try_get("approved")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait]
impl ApprovalStore for SqliteApprovalStore {
    async fn upsert(&self, review_id: i64, listing_name: &str, approved: bool) -> Result<ApprovalRecord> {
        let listing_name = listing_name.trim();
        let has_name = !listing_name.is_empty();
        let stored_name = if has_name { listing_name } else { UNKNOWN_LISTING_NAME };
        let now = format_timestamp(Utc::now());

        let row = sqlx::query(
            r#"
            INSERT INTO review_approvals (review_id, listing_name, approved, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT(review_id) DO UPDATE SET
                approved = excluded.approved,
                listing_name = CASE WHEN ?5 THEN excluded.listing_name
                                    ELSE review_approvals.listing_name END,
                updated_at = MAX(review_approvals.updated_at, excluded.updated_at)
            RETURNING review_id, listing_name, approved, created_at, updated_at
            "#,
        )
        .bind(review_id)
        .bind(stored_name)
        .bind(approved)
        .bind(&now)
        .bind(has_name)
        .fetch_one(&self.pool)
        .await?;

        record_from_row(&row)
    }

    async fn list_all(&self, filter: ApprovalFilter) -> Result<Vec<ApprovalRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT review_id, listing_name, approved, created_at, updated_at
            FROM review_approvals
            WHERE ?1 IS NULL OR approved = ?1
            ORDER BY review_id
            "#,
        )
        .bind(filter.approved)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteApprovalStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteApprovalStore::new(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let store = memory_store().await;

        let created = store.upsert(7453, "", true).await.unwrap();
        assert_eq!(created.listing_name, UNKNOWN_LISTING_NAME);
        assert!(created.approved);

        let updated = store.upsert(7453, "2B E1 - 33 St Clements", false).await.unwrap();
        assert_eq!(updated.listing_name, "2B E1 - 33 St Clements");
        assert!(!updated.approved);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        let kept = store.upsert(7453, "", true).await.unwrap();
        assert_eq!(kept.listing_name, "2B E1 - 33 St Clements");
    }

    #[tokio::test]
    async fn test_list_all_filter_and_order() {
        let store = memory_store().await;
        store.upsert(9, "a", true).await.unwrap();
        store.upsert(4, "b", false).await.unwrap();
        store.upsert(6, "c", true).await.unwrap();

        let all: Vec<i64> = store
            .list_all(ApprovalFilter::default())
            .await
            .unwrap()
            .iter()
            .map(|r| r.review_id)
            .collect();
        assert_eq!(all, vec![4, 6, 9]);

        let approved = store.list_all(ApprovalFilter::approved_only()).await.unwrap();
        assert_eq!(approved.len(), 2);
        assert!(approved.iter().all(|r| r.approved));
    }

    #[tokio::test]
    async fn test_decisions_survive_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("approvals.db");

        {
            let store = SqliteApprovalStore::connect(&path).await.unwrap();
            store.upsert(1, "Putney", true).await.unwrap();
            store.pool.close().await;
        }

        let reopened = SqliteApprovalStore::connect(&path).await.unwrap();
        let records = reopened.list_all(ApprovalFilter::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].listing_name, "Putney");
    }
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::database::types::{DBool, DUuid};
use crate::database::Database;

/// One shared ciphertext blob and its consumption state.
///
/// A record is deliverable iff `!is_deleted && now < expires_at &&
/// download_count < max_downloads`. Once any of those stops holding the row
/// transitions to deleted and stays there; the row itself is kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShareRecord {
    pub id: DUuid,
    /// Key of the ciphertext in the blob store. Never inspected server-side.
    pub blob_ref: String,
    pub display_name: String,
    pub mime_hint: String,
    pub byte_size: i64,
    pub max_downloads: i64,
    pub download_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub is_deleted: DBool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_accessed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const ALL_COLUMNS: &str = r#"
    id, blob_ref, display_name, mime_hint, byte_size,
    max_downloads, download_count, expires_at,
    is_deleted, deleted_at, last_accessed_at, created_at
"#;

impl ShareRecord {
    /// Insert a new record. The caller must have durably written the blob
    /// under `blob_ref` before calling this; the record becomes visible to
    /// fetches the moment the insert commits.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        id: Uuid,
        blob_ref: &str,
        display_name: &str,
        mime_hint: &str,
        byte_size: i64,
        max_downloads: i64,
        created_at: OffsetDateTime,
        expires_at: OffsetDateTime,
        db: &Database,
    ) -> Result<ShareRecord, sqlx::Error> {
        let id = DUuid::from(id);

        sqlx::query(
            r#"
            INSERT INTO share_records (
                id, blob_ref, display_name, mime_hint, byte_size,
                max_downloads, expires_at, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(id)
        .bind(blob_ref)
        .bind(display_name)
        .bind(mime_hint)
        .bind(byte_size)
        .bind(max_downloads)
        .bind(expires_at)
        .bind(created_at)
        .execute(&**db)
        .await?;

        Self::get(*id, db).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Get a record by ID, deleted or not.
    pub async fn get(id: Uuid, db: &Database) -> Result<Option<ShareRecord>, sqlx::Error> {
        let id = DUuid::from(id);
        sqlx::query_as::<_, ShareRecord>(&format!(
            "SELECT {ALL_COLUMNS} FROM share_records WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&**db)
        .await
    }

    /// Atomically consume one unit of the download allowance.
    ///
    /// The deliverability check and the counter increment are a single
    /// conditional UPDATE, so concurrent fetches on the same record serialize
    /// here: when one download remains and several requests race, exactly one
    /// sees a row come back and every other caller gets `None`. Callers must
    /// not pre-check with a separate read-then-write.
    pub async fn consume_download(
        id: Uuid,
        now: OffsetDateTime,
        db: &Database,
    ) -> Result<Option<ShareRecord>, sqlx::Error> {
        let id = DUuid::from(id);
        sqlx::query_as::<_, ShareRecord>(&format!(
            r#"
            UPDATE share_records
            SET download_count = download_count + 1, last_accessed_at = ?2
            WHERE id = ?1
              AND is_deleted = 0
              AND download_count < max_downloads
              AND ?2 < expires_at
            RETURNING {ALL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&**db)
        .await
    }

    /// Flag a record deleted. Returns whether this call made the transition;
    /// at most one caller ever sees `true` for a given record, which makes it
    /// safe for fetch-triggered purges, manual deletes, and the sweeper to
    /// race on the same row.
    pub async fn mark_deleted(
        id: Uuid,
        now: OffsetDateTime,
        db: &Database,
    ) -> Result<bool, sqlx::Error> {
        let id = DUuid::from(id);
        let result = sqlx::query(
            r#"
            UPDATE share_records
            SET is_deleted = 1, deleted_at = ?2
            WHERE id = ?1 AND is_deleted = 0
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&**db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Live records that are past their expiry or out of downloads.
    pub async fn sweep_candidates(
        now: OffsetDateTime,
        db: &Database,
    ) -> Result<Vec<ShareRecord>, sqlx::Error> {
        sqlx::query_as::<_, ShareRecord>(&format!(
            r#"
            SELECT {ALL_COLUMNS}
            FROM share_records
            WHERE is_deleted = 0
              AND (expires_at <= ?1 OR download_count >= max_downloads)
            ORDER BY created_at ASC
            "#
        ))
        .bind(now)
        .fetch_all(&**db)
        .await
    }

    /// Aggregate counters for the stats endpoint.
    pub async fn stats(db: &Database) -> Result<LedgerStats, sqlx::Error> {
        sqlx::query_as::<_, LedgerStats>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN is_deleted = 0 THEN 1 ELSE 0 END), 0) AS active_count,
                COALESCE(SUM(CASE WHEN is_deleted = 1 THEN 1 ELSE 0 END), 0) AS deleted_count,
                COUNT(*) AS total_count,
                COALESCE(SUM(CASE WHEN is_deleted = 0 THEN byte_size ELSE 0 END), 0) AS active_bytes,
                MAX(created_at) AS last_upload_at
            FROM share_records
            "#,
        )
        .fetch_one(&**db)
        .await
    }

    pub fn remaining_downloads(&self) -> i64 {
        (self.max_downloads - self.download_count).max(0)
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    pub fn is_exhausted(&self) -> bool {
        self.download_count >= self.max_downloads
    }
}

/// Aggregate ledger counters, read-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerStats {
    pub active_count: i64,
    pub deleted_count: i64,
    pub total_count: i64,
    pub active_bytes: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_upload_at: Option<OffsetDateTime>,
}

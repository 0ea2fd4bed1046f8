//! Exchange ledger: the lifecycle state machine for shared blobs.
//!
//! The ledger owns the mapping from identifier to ciphertext blob plus its
//! consumption state, and guarantees the deliverability invariant under
//! concurrent access. A record moves `Active -> Deleted` exactly once, no
//! matter how many fetches, manual deletes, and sweeper passes race on it.

mod clock;

use std::sync::Arc;

use bytes::Bytes;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use object_store::{BlobStore, BlobStoreError};

use crate::database::models::{LedgerStats, ShareRecord};
use crate::database::types::DUuid;
use crate::database::Database;

pub use clock::{Clock, ManualClock, SystemClock};

/// Outcomes of ledger operations that the interface layer can explain to the
/// user: a share being gone by expiry and gone by exhaustion are different
/// stories, and never fold into a generic error.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("share not found")]
    NotFound,
    #[error("share expired")]
    Expired,
    #[error("download limit reached")]
    LimitReached,
    #[error("record store error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("blob store error: {0}")]
    Blobs(#[from] BlobStoreError),
}

impl LedgerError {
    /// Whether this is a transient storage failure rather than a terminal
    /// lifecycle outcome.
    pub fn is_storage(&self) -> bool {
        matches!(self, LedgerError::Database(_) | LedgerError::Blobs(_))
    }
}

/// A successful fetch: the ciphertext plus the record state as of the
/// consuming increment (so `remaining_downloads` reflects this delivery).
#[derive(Debug, Clone)]
pub struct Delivery {
    pub bytes: Bytes,
    pub record: ShareRecord,
}

/// Metadata attached to an upload. Display-only; nothing here affects
/// decryptability of the blob.
#[derive(Debug, Clone)]
pub struct UploadMeta {
    pub display_name: String,
    pub mime_hint: String,
}

#[derive(Clone)]
pub struct Ledger {
    database: Database,
    blobs: BlobStore,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(database: Database, blobs: BlobStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            database,
            blobs,
            clock,
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Store a ciphertext blob and create its record.
    ///
    /// The blob write is durable before the record exists, so a visible
    /// record always references a written blob. If the record insert fails
    /// the blob is rolled back; no orphan survives.
    pub async fn create(
        &self,
        bytes: Bytes,
        meta: UploadMeta,
        max_downloads: i64,
        ttl: Duration,
    ) -> Result<ShareRecord, LedgerError> {
        let id = DUuid::generate();
        let blob_ref = id.to_string();
        let now = self.clock.now();
        let byte_size = bytes.len() as i64;

        self.blobs.put(&blob_ref, bytes).await?;

        let record = ShareRecord::create(
            *id,
            &blob_ref,
            &meta.display_name,
            &meta.mime_hint,
            byte_size,
            max_downloads,
            now,
            now + ttl,
            &self.database,
        )
        .await;

        match record {
            Ok(record) => {
                tracing::info!(
                    id = %record.id,
                    name = %record.display_name,
                    size = record.byte_size,
                    max_downloads = record.max_downloads,
                    expires_at = %record.expires_at,
                    "share created"
                );
                Ok(record)
            }
            Err(e) => {
                // Roll the blob back so a failed create leaves nothing behind.
                if let Err(purge_err) = self.blobs.delete(&blob_ref).await {
                    tracing::warn!(id = %id, error = %purge_err, "rollback blob delete failed");
                }
                Err(e.into())
            }
        }
    }

    /// Fetch the ciphertext for a share, consuming one download.
    ///
    /// When several fetches race on the last remaining download, exactly one
    /// receives the bytes; the losers observe `LimitReached`. If this call
    /// consumes the final download the blob is purged before the bytes are
    /// returned, so no later fetch can observe the record as active.
    pub async fn fetch(&self, id: Uuid) -> Result<Delivery, LedgerError> {
        let now = self.clock.now();

        let record = ShareRecord::get(id, &self.database)
            .await?
            .ok_or(LedgerError::NotFound)?;

        if *record.is_deleted {
            return Err(Self::classify_dead(&record, now));
        }

        if record.is_expired(now) {
            self.transition_to_deleted(&record, now).await;
            return Err(LedgerError::Expired);
        }

        // Unreachable while the consuming increment below holds the invariant,
        // but an exhausted record that somehow survived still dies here.
        if record.is_exhausted() {
            self.transition_to_deleted(&record, now).await;
            return Err(LedgerError::LimitReached);
        }

        // Re-verify the blob really is on the storage backend. A record whose
        // bytes are gone out-of-band is unusable: purge it rather than retry.
        let bytes = match self.blobs.get(&record.blob_ref).await? {
            Some(bytes) => bytes,
            None => {
                // A racing fetch may have just exhausted the share and purged
                // the bytes between our record read and this blob read.
                // Re-read to tell that apart from genuine out-of-band loss.
                let current = ShareRecord::get(id, &self.database)
                    .await?
                    .ok_or(LedgerError::NotFound)?;
                if *current.is_deleted || current.is_exhausted() || current.is_expired(now) {
                    return Err(Self::classify_dead(&current, now));
                }

                tracing::warn!(id = %record.id, "blob missing for active record, purging");
                self.transition_to_deleted(&current, now).await;
                return Err(LedgerError::NotFound);
            }
        };

        // Single atomic check-and-increment; the loser of a race never gets
        // past this point, so it never sees the bytes read above.
        let consumed = match ShareRecord::consume_download(id, now, &self.database).await? {
            Some(record) => record,
            None => {
                // Lost the race (or expired between the read and the update):
                // re-read to report the precise reason.
                let current = ShareRecord::get(id, &self.database)
                    .await?
                    .ok_or(LedgerError::NotFound)?;
                return Err(Self::classify_dead(&current, now));
            }
        };

        tracing::info!(
            id = %consumed.id,
            download_count = consumed.download_count,
            max_downloads = consumed.max_downloads,
            "share downloaded"
        );

        // The increment that exhausts the allowance also tears the share
        // down, before the caller gets its response. The bytes are already in
        // hand, so the only cost is one blob delete on the final download.
        if consumed.is_exhausted() {
            self.transition_to_deleted(&consumed, now).await;
        }

        Ok(Delivery {
            bytes,
            record: consumed,
        })
    }

    /// Inspect a share without consuming a download.
    pub async fn info(&self, id: Uuid) -> Result<ShareRecord, LedgerError> {
        let now = self.clock.now();
        let record = ShareRecord::get(id, &self.database)
            .await?
            .ok_or(LedgerError::NotFound)?;

        if *record.is_deleted {
            return Err(Self::classify_dead(&record, now));
        }
        if record.is_expired(now) {
            return Err(LedgerError::Expired);
        }
        if record.is_exhausted() {
            return Err(LedgerError::LimitReached);
        }
        Ok(record)
    }

    /// Manual delete. Idempotent: returns whether this call changed anything.
    pub async fn delete(&self, id: Uuid) -> Result<bool, LedgerError> {
        let now = self.clock.now();
        let record = match ShareRecord::get(id, &self.database).await? {
            Some(record) => record,
            None => return Ok(false),
        };
        if *record.is_deleted {
            return Ok(false);
        }

        let transitioned = self.transition_to_deleted(&record, now).await;
        if transitioned {
            tracing::info!(id = %record.id, "share deleted manually");
        }
        Ok(transitioned)
    }

    /// Sweep stale records: expired or exhausted but still flagged live.
    ///
    /// Returns the number of records this pass actually transitioned. Safe to
    /// race with fetch-triggered deletion and with itself; `mark_deleted` is
    /// the single arbiter, so nothing is double-counted.
    pub async fn sweep(&self) -> Result<u64, LedgerError> {
        let now = self.clock.now();
        let candidates = ShareRecord::sweep_candidates(now, &self.database).await?;
        if candidates.is_empty() {
            return Ok(0);
        }

        tracing::debug!(count = candidates.len(), "sweeping stale shares");

        let mut swept = 0u64;
        for record in candidates {
            if self.transition_to_deleted(&record, now).await {
                swept += 1;
            }
        }

        if swept > 0 {
            tracing::info!(count = swept, "sweep removed stale shares");
        }
        Ok(swept)
    }

    /// Aggregate counters, read-only.
    pub async fn stats(&self) -> Result<LedgerStats, LedgerError> {
        Ok(ShareRecord::stats(&self.database).await?)
    }

    /// Flag the record deleted and purge its blob. Returns whether this call
    /// won the transition. The flag flips first: once a racer has won, the
    /// record is unreachable through `fetch` even while the blob delete is
    /// still in flight, and the blob delete itself is idempotent.
    async fn transition_to_deleted(&self, record: &ShareRecord, now: OffsetDateTime) -> bool {
        let transitioned = match ShareRecord::mark_deleted(*record.id, now, &self.database).await {
            Ok(transitioned) => transitioned,
            Err(e) => {
                tracing::error!(id = %record.id, error = %e, "failed to flag record deleted");
                return false;
            }
        };

        if transitioned {
            if let Err(e) = self.blobs.delete(&record.blob_ref).await {
                tracing::warn!(id = %record.id, error = %e, "blob purge failed");
            }
        }
        transitioned
    }

    /// Explain why a dead (or lost-race) record is gone, so the n+1-th fetch
    /// after exhaustion reports the limit rather than a bare not-found.
    ///
    /// A record flagged before its expiry without using up its allowance was
    /// deleted manually; that one stays a plain not-found forever.
    fn classify_dead(record: &ShareRecord, now: OffsetDateTime) -> LedgerError {
        let manually_deleted = record
            .deleted_at
            .map(|at| at < record.expires_at)
            .unwrap_or(false);

        if record.is_exhausted() {
            LedgerError::LimitReached
        } else if manually_deleted {
            LedgerError::NotFound
        } else if record.is_expired(now) {
            LedgerError::Expired
        } else if *record.is_deleted {
            LedgerError::NotFound
        } else {
            // Lost consume race on a record that re-reads as deliverable;
            // count and deleted only move one way, so this cannot happen.
            LedgerError::LimitReached
        }
    }
}

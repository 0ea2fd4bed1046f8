//! Integration tests for the exchange ledger lifecycle.
//!
//! These run against an in-memory sqlite database and the in-memory blob
//! backend, with a manually advanced clock so no test waits on wall-clock
//! time.

use std::sync::Arc;

use bytes::Bytes;
use time::{Duration, OffsetDateTime};

use object_store::BlobStore;
use vaultdrop_daemon::database::models::ShareRecord;
use vaultdrop_daemon::database::Database;
use vaultdrop_daemon::ledger::{Clock, Ledger, LedgerError, ManualClock, UploadMeta};

async fn setup() -> (Ledger, ManualClock) {
    let db_url = url::Url::parse("sqlite::memory:").unwrap();
    let db = Database::connect(&db_url).await.unwrap();

    let clock = ManualClock::new(OffsetDateTime::from_unix_timestamp(1_750_000_000).unwrap());
    let ledger = Ledger::new(db, BlobStore::memory(), Arc::new(clock.clone()));
    (ledger, clock)
}

fn meta(name: &str) -> UploadMeta {
    UploadMeta {
        display_name: name.to_string(),
        mime_hint: "application/octet-stream".to_string(),
    }
}

#[tokio::test]
async fn test_create_then_fetch_roundtrip() {
    let (ledger, _clock) = setup().await;
    let payload = Bytes::from_static(b"sealed envelope bytes");

    let record = ledger
        .create(payload.clone(), meta("doc.bin"), 2, Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(record.download_count, 0);
    assert_eq!(record.remaining_downloads(), 2);
    assert!(!*record.is_deleted);

    let delivery = ledger.fetch(*record.id).await.unwrap();
    assert_eq!(delivery.bytes, payload);
    assert_eq!(delivery.record.download_count, 1);
    assert_eq!(delivery.record.remaining_downloads(), 1);
    assert!(delivery.record.last_accessed_at.is_some());
}

#[tokio::test]
async fn test_exactly_n_downloads_then_limit() {
    let (ledger, _clock) = setup().await;
    let record = ledger
        .create(Bytes::from_static(b"x"), meta("x"), 3, Duration::hours(1))
        .await
        .unwrap();

    for _ in 0..3 {
        ledger.fetch(*record.id).await.unwrap();
    }

    // The 4th and every subsequent fetch reports the limit, not a bare 404.
    for _ in 0..3 {
        assert!(matches!(
            ledger.fetch(*record.id).await,
            Err(LedgerError::LimitReached)
        ));
    }
}

#[tokio::test]
async fn test_single_download_share_self_destructs() {
    let (ledger, _clock) = setup().await;
    let record = ledger
        .create(Bytes::from_static(b"once"), meta("once"), 1, Duration::hours(1))
        .await
        .unwrap();

    let delivery = ledger.fetch(*record.id).await.unwrap();
    assert_eq!(delivery.bytes, Bytes::from_static(b"once"));
    assert_eq!(delivery.record.remaining_downloads(), 0);

    // The consuming fetch tore the share down before returning: the record is
    // flagged and the blob bytes are gone.
    let stored = ShareRecord::get(*record.id, ledger.database())
        .await
        .unwrap()
        .unwrap();
    assert!(*stored.is_deleted);
    assert!(stored.deleted_at.is_some());
    assert!(ledger
        .blobs()
        .get(&record.blob_ref)
        .await
        .unwrap()
        .is_none());

    assert!(matches!(
        ledger.fetch(*record.id).await,
        Err(LedgerError::LimitReached)
    ));
}

#[tokio::test]
async fn test_expired_share_never_serves_stale_bytes() {
    let (ledger, clock) = setup().await;
    let record = ledger
        .create(Bytes::from_static(b"stale"), meta("stale"), 5, Duration::hours(1))
        .await
        .unwrap();

    clock.advance(Duration::hours(2));

    assert!(matches!(
        ledger.fetch(*record.id).await,
        Err(LedgerError::Expired)
    ));

    // The expiry-triggered fetch purged the share.
    let stored = ShareRecord::get(*record.id, ledger.database())
        .await
        .unwrap()
        .unwrap();
    assert!(*stored.is_deleted);
    assert_eq!(stored.download_count, 0);
    assert!(ledger
        .blobs()
        .get(&record.blob_ref)
        .await
        .unwrap()
        .is_none());

    // Still expired, not limit-reached, on later attempts.
    assert!(matches!(
        ledger.fetch(*record.id).await,
        Err(LedgerError::Expired)
    ));
}

#[tokio::test]
async fn test_zero_ttl_share_is_born_expired() {
    let (ledger, _clock) = setup().await;
    let record = ledger
        .create(Bytes::from_static(b"gone"), meta("gone"), 1, Duration::ZERO)
        .await
        .unwrap();

    assert!(matches!(
        ledger.fetch(*record.id).await,
        Err(LedgerError::Expired)
    ));

    // A later sweep finds nothing left to do for it.
    assert_eq!(ledger.sweep().await.unwrap(), 0);
}

#[tokio::test]
async fn test_info_does_not_consume_downloads() {
    let (ledger, _clock) = setup().await;
    let record = ledger
        .create(Bytes::from_static(b"peek"), meta("peek"), 1, Duration::hours(1))
        .await
        .unwrap();

    for _ in 0..5 {
        let info = ledger.info(*record.id).await.unwrap();
        assert_eq!(info.remaining_downloads(), 1);
    }

    // The single download is still available after all that peeking.
    ledger.fetch(*record.id).await.unwrap();

    // And info now explains why the share is gone.
    assert!(matches!(
        ledger.info(*record.id).await,
        Err(LedgerError::LimitReached)
    ));
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let (ledger, _clock) = setup().await;
    let missing = uuid::Uuid::new_v4();

    assert!(matches!(
        ledger.fetch(missing).await,
        Err(LedgerError::NotFound)
    ));
    assert!(matches!(
        ledger.info(missing).await,
        Err(LedgerError::NotFound)
    ));
    assert!(!ledger.delete(missing).await.unwrap());
}

#[tokio::test]
async fn test_manual_delete_is_idempotent() {
    let (ledger, _clock) = setup().await;
    let record = ledger
        .create(Bytes::from_static(b"bye"), meta("bye"), 5, Duration::hours(1))
        .await
        .unwrap();

    assert!(ledger.delete(*record.id).await.unwrap());
    assert!(ledger
        .blobs()
        .get(&record.blob_ref)
        .await
        .unwrap()
        .is_none());

    // Second delete reports nothing changed.
    assert!(!ledger.delete(*record.id).await.unwrap());

    // A manually deleted share is simply gone; there is no limit or expiry
    // story to tell.
    assert!(matches!(
        ledger.fetch(*record.id).await,
        Err(LedgerError::NotFound)
    ));
}

#[tokio::test]
async fn test_missing_blob_degrades_record() {
    let (ledger, _clock) = setup().await;
    let record = ledger
        .create(Bytes::from_static(b"lost"), meta("lost"), 5, Duration::hours(1))
        .await
        .unwrap();

    // Simulate out-of-band loss of the stored bytes.
    ledger.blobs().delete(&record.blob_ref).await.unwrap();

    assert!(matches!(
        ledger.fetch(*record.id).await,
        Err(LedgerError::NotFound)
    ));

    // The record did not stay active pointing at nothing.
    let stored = ShareRecord::get(*record.id, ledger.database())
        .await
        .unwrap()
        .unwrap();
    assert!(*stored.is_deleted);
    assert_eq!(stored.download_count, 0);
}

#[tokio::test]
async fn test_sweep_reaps_expired_shares() {
    let (ledger, clock) = setup().await;

    let short = ledger
        .create(Bytes::from_static(b"short"), meta("short"), 5, Duration::hours(1))
        .await
        .unwrap();
    let long = ledger
        .create(Bytes::from_static(b"long"), meta("long"), 5, Duration::hours(3))
        .await
        .unwrap();

    clock.advance(Duration::hours(2));

    assert_eq!(ledger.sweep().await.unwrap(), 1);

    let swept = ShareRecord::get(*short.id, ledger.database())
        .await
        .unwrap()
        .unwrap();
    assert!(*swept.is_deleted);
    assert!(ledger.blobs().get(&short.blob_ref).await.unwrap().is_none());

    // The longer-lived share is untouched and still deliverable.
    let alive = ledger.fetch(*long.id).await.unwrap();
    assert_eq!(alive.bytes, Bytes::from_static(b"long"));

    // Nothing further to sweep.
    assert_eq!(ledger.sweep().await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_rollback_leaves_no_orphan_blob() {
    let (ledger, _clock) = setup().await;

    // Force the record insert to fail after the blob write.
    sqlx::query("DROP TABLE share_records")
        .execute(&**ledger.database())
        .await
        .unwrap();

    let result = ledger
        .create(Bytes::from_static(b"orphan?"), meta("orphan"), 1, Duration::hours(1))
        .await;

    let err = result.err().expect("create must fail without a record store");
    assert!(err.is_storage());

    // The already-written blob was rolled back.
    assert!(ledger.blobs().list_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_filesystem_blobs_are_removed_on_exhaustion() {
    let db_url = url::Url::parse("sqlite::memory:").unwrap();
    let db = Database::connect(&db_url).await.unwrap();
    let temp_dir = tempfile::tempdir().unwrap();
    let blobs = BlobStore::new(object_store::ObjectStoreConfig::Local {
        path: temp_dir.path().to_path_buf(),
    })
    .await
    .unwrap();
    let clock = ManualClock::new(OffsetDateTime::from_unix_timestamp(1_750_000_000).unwrap());
    let ledger = Ledger::new(db, blobs, Arc::new(clock.clone()));

    let record = ledger
        .create(Bytes::from_static(b"on disk"), meta("disk"), 1, Duration::hours(1))
        .await
        .unwrap();

    let blob_path = temp_dir.path().join("blobs").join(&record.blob_ref);
    assert!(blob_path.exists());

    ledger.fetch(*record.id).await.unwrap();

    // The bytes are really gone from disk, not just flagged in the ledger.
    assert!(!blob_path.exists());
}

#[tokio::test]
async fn test_stats_track_lifecycle() {
    let (ledger, clock) = setup().await;

    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.total_count, 0);
    assert!(stats.last_upload_at.is_none());

    let a = ledger
        .create(Bytes::from(vec![0u8; 100]), meta("a"), 1, Duration::hours(1))
        .await
        .unwrap();
    let _b = ledger
        .create(Bytes::from(vec![0u8; 50]), meta("b"), 5, Duration::hours(1))
        .await
        .unwrap();

    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.active_count, 2);
    assert_eq!(stats.deleted_count, 0);
    assert_eq!(stats.active_bytes, 150);
    assert_eq!(stats.last_upload_at, Some(clock.now()));

    // Exhaust share a; it flips to deleted and its bytes leave the total.
    ledger.fetch(*a.id).await.unwrap();

    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.active_count, 1);
    assert_eq!(stats.deleted_count, 1);
    assert_eq!(stats.total_count, 2);
    assert_eq!(stats.active_bytes, 50);
}

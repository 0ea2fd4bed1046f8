//! Concurrency tests for the exchange ledger.
//!
//! The deliverability check and the download-count increment are one atomic
//! conditional update, so racing fetches must never over-deliver: with N
//! downloads allowed and M > N concurrent requests, exactly N succeed.

use std::sync::Arc;

use bytes::Bytes;
use time::{Duration, OffsetDateTime};

use object_store::BlobStore;
use vaultdrop_daemon::database::models::ShareRecord;
use vaultdrop_daemon::database::Database;
use vaultdrop_daemon::ledger::{Ledger, LedgerError, ManualClock, UploadMeta};

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

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_fetches_deliver_exactly_n() {
    let (ledger, _clock) = setup().await;
    let payload = Bytes::from_static(b"contended envelope");

    let record = ledger
        .create(payload.clone(), meta("hot"), 3, Duration::hours(1))
        .await
        .unwrap();
    let id = *record.id;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move { ledger.fetch(id).await }));
    }

    let mut delivered = 0;
    let mut limit_reached = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(delivery) => {
                // A winner always gets the full, untruncated envelope.
                assert_eq!(delivery.bytes, payload);
                delivered += 1;
            }
            Err(LedgerError::LimitReached) => limit_reached += 1,
            Err(other) => panic!("unexpected outcome: {other}"),
        }
    }

    assert_eq!(delivered, 3);
    assert_eq!(limit_reached, 7);

    // The final delivery tore the share down.
    let stored = ShareRecord::get(id, ledger.database()).await.unwrap().unwrap();
    assert!(*stored.is_deleted);
    assert_eq!(stored.download_count, 3);
    assert!(ledger.blobs().get(&record.blob_ref).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_fetches_on_last_download() {
    let (ledger, _clock) = setup().await;

    // Many rounds of a 2-way race on a single remaining download.
    for round in 0..20 {
        let record = ledger
            .create(
                Bytes::from_static(b"last one"),
                meta(&format!("round-{round}")),
                1,
                Duration::hours(1),
            )
            .await
            .unwrap();
        let id = *record.id;

        let a = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.fetch(id).await })
        };
        let b = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.fetch(id).await })
        };

        let outcomes = [a.await.unwrap(), b.await.unwrap()];
        let wins = outcomes.iter().filter(|o| o.is_ok()).count();
        assert_eq!(wins, 1, "exactly one racer may receive the bytes");

        for outcome in outcomes {
            if let Err(e) = outcome {
                assert!(matches!(e, LedgerError::LimitReached));
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sweep_and_delete_race_without_double_counting() {
    let (ledger, clock) = setup().await;

    let record = ledger
        .create(Bytes::from_static(b"contended"), meta("c"), 5, Duration::hours(1))
        .await
        .unwrap();
    let id = *record.id;

    clock.advance(Duration::hours(2));

    // A manual delete and a sweep race on the same expired record; between
    // them the transition happens exactly once.
    let sweep = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.sweep().await })
    };
    let delete = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.delete(id).await })
    };

    let swept = sweep.await.unwrap().unwrap();
    let deleted = delete.await.unwrap().unwrap();

    assert_eq!(swept + u64::from(deleted), 1);

    let stored = ShareRecord::get(id, ledger.database()).await.unwrap().unwrap();
    assert!(*stored.is_deleted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sweeps_are_idempotent() {
    let (ledger, clock) = setup().await;

    for i in 0..5 {
        ledger
            .create(
                Bytes::from_static(b"stale"),
                meta(&format!("s-{i}")),
                1,
                Duration::hours(1),
            )
            .await
            .unwrap();
    }

    clock.advance(Duration::hours(2));

    let first = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.sweep().await })
    };
    let second = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.sweep().await })
    };

    let a = first.await.unwrap().unwrap();
    let b = second.await.unwrap().unwrap();

    // Overlapping sweeps split the work but never count a record twice.
    assert_eq!(a + b, 5);
    assert_eq!(ledger.sweep().await.unwrap(), 0);
}

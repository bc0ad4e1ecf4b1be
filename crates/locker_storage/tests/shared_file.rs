//! Two handles on one database file, as when `retry-failed` runs next to the
//! agent, and behavior shared by every store.

use chrono::Utc;
use locker_core::{NewPackage, PackageStatus};
use locker_storage::{InMemoryRecordStore, RecordStore, SqliteRecordStore, StoreError};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn writes_are_visible_across_handles() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locker.db");
    let agent = SqliteRecordStore::open(&path).unwrap();
    let operator = SqliteRecordStore::open(&path).unwrap();

    let created = agent
        .create(NewPackage::new("PKG-1", "locker-a", Utc::now()))
        .unwrap();

    let mut seen = operator.get(created.id).unwrap().unwrap();
    seen.begin_attempt(Utc::now());
    operator.save(&seen).unwrap();

    assert_eq!(agent.get(created.id).unwrap().unwrap().sync_attempt_count, 1);
}

#[test]
fn stale_handle_cannot_unsync_a_record() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locker.db");
    let agent = SqliteRecordStore::open(&path).unwrap();
    let operator = SqliteRecordStore::open(&path).unwrap();

    let record = agent
        .create(NewPackage::new("PKG-1", "locker-a", Utc::now()))
        .unwrap();
    let stale = operator.get(record.id).unwrap().unwrap();

    let mut synced = record.clone();
    synced.begin_attempt(Utc::now());
    synced.status = PackageStatus::Synced;
    agent.save(&synced).unwrap();

    let mut reset = stale;
    reset.reset_for_retry();
    assert!(matches!(
        operator.save(&reset),
        Err(StoreError::AlreadySynced(id)) if id == record.id
    ));
    assert!(agent.get(record.id).unwrap().unwrap().is_synced());
}

#[test]
fn concurrent_writers_on_one_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locker.db");
    SqliteRecordStore::open(&path).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let path = path.clone();
            thread::spawn(move || {
                let store = SqliteRecordStore::open(&path).unwrap();
                for n in 0..25 {
                    store
                        .create(NewPackage::new(
                            format!("W{worker}-{n}"),
                            "locker-a",
                            Utc::now(),
                        ))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let store = SqliteRecordStore::open(&path).unwrap();
    assert_eq!(store.status_counts().unwrap().pending, 100);
}

fn exercise(store: Arc<dyn RecordStore>) {
    let now = Utc::now();
    let a = store.create(NewPackage::new("A", "locker-a", now)).unwrap();
    let mut b = store.create(NewPackage::new("B", "locker-a", now)).unwrap();
    let mut c = store.create(NewPackage::new("C", "locker-a", now)).unwrap();
    assert!(a.id < b.id && b.id < c.id);

    b.sync_attempt_count = 3;
    b.last_sync_attempt = Some(now);
    store.save(&b).unwrap();
    c.status = PackageStatus::Synced;
    store.save(&c).unwrap();

    let eligible: Vec<_> = store
        .list_eligible_for_sync(3)
        .unwrap()
        .into_iter()
        .map(|r| r.tracking_id)
        .collect();
    assert_eq!(eligible, ["A"]);

    let stuck: Vec<_> = store
        .list_needing_intervention(3)
        .unwrap()
        .into_iter()
        .map(|r| r.tracking_id)
        .collect();
    assert_eq!(stuck, ["B"]);

    let counts = store.status_counts().unwrap();
    assert_eq!((counts.pending, counts.synced, counts.failed), (2, 1, 0));

    assert!(matches!(
        store.create(NewPackage::new("A", "locker-b", now)),
        Err(StoreError::DuplicateTrackingId(_))
    ));
    assert!(store.find_by_tracking_id("missing").unwrap().is_none());
}

#[test]
fn memory_store_behavior() {
    exercise(Arc::new(InMemoryRecordStore::new()));
}

#[test]
fn sqlite_store_behavior() {
    let dir = TempDir::new().unwrap();
    exercise(Arc::new(
        SqliteRecordStore::open(&dir.path().join("locker.db")).unwrap(),
    ));
}

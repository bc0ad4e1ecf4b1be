//! In-memory record store for testing.

use crate::error::{StoreError, StoreResult};
use crate::store::RecordStore;
use locker_core::{NewPackage, PackageRecord, PackageStatus};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory record store.
///
/// This store keeps all records in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral runs that don't need persistence
///
/// Writes can be made to fail on demand with [`set_fail_writes`], which is
/// how tests exercise storage failures.
///
/// [`set_fail_writes`]: InMemoryRecordStore::set_fail_writes
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use locker_core::NewPackage;
/// use locker_storage::{InMemoryRecordStore, RecordStore};
///
/// let store = InMemoryRecordStore::new();
/// let record = store.create(NewPackage::new("T1", "locker-a", Utc::now())).unwrap();
/// assert_eq!(record.id, 1);
/// assert!(store.get(1).unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<PackageRecord>>,
    fail_writes: AtomicBool,
}

impl InMemoryRecordStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing records.
    ///
    /// Useful for testing states that normal operation reaches slowly.
    #[must_use]
    pub fn with_records(records: Vec<PackageRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes subsequent `create` and `save` calls fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of all records.
    #[must_use]
    pub fn records(&self) -> Vec<PackageRecord> {
        self.records.read().clone()
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("writes disabled".into()))
        } else {
            Ok(())
        }
    }

    fn select(&self, predicate: impl Fn(&PackageRecord) -> bool) -> Vec<PackageRecord> {
        let mut out: Vec<PackageRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.id);
        out
    }
}

impl RecordStore for InMemoryRecordStore {
    fn init(&self) -> StoreResult<()> {
        self.check_writable()
    }

    fn create(&self, package: NewPackage) -> StoreResult<PackageRecord> {
        self.check_writable()?;
        let mut records = self.records.write();

        if records.iter().any(|r| r.tracking_id == package.tracking_id) {
            return Err(StoreError::DuplicateTrackingId(package.tracking_id));
        }

        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = PackageRecord {
            id,
            tracking_id: package.tracking_id,
            locker_id: package.locker_id,
            status: PackageStatus::Pending,
            drop_off_timestamp: package.drop_off_timestamp,
            sync_attempt_count: 0,
            last_sync_attempt: None,
        };
        records.push(record.clone());
        Ok(record)
    }

    fn get(&self, id: i64) -> StoreResult<Option<PackageRecord>> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    fn find_by_tracking_id(&self, tracking_id: &str) -> StoreResult<Option<PackageRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| r.tracking_id == tracking_id)
            .cloned())
    }

    fn list_eligible_for_sync(&self, max_retries: u32) -> StoreResult<Vec<PackageRecord>> {
        Ok(self.select(|r| !r.is_synced() && r.sync_attempt_count < max_retries))
    }

    fn list_needing_intervention(&self, max_retries: u32) -> StoreResult<Vec<PackageRecord>> {
        Ok(self.select(|r| {
            r.status == PackageStatus::Failed
                || (r.status == PackageStatus::Pending && r.sync_attempt_count >= max_retries)
        }))
    }

    fn list_all(&self) -> StoreResult<Vec<PackageRecord>> {
        Ok(self.select(|_| true))
    }

    fn save(&self, record: &PackageRecord) -> StoreResult<()> {
        self.check_writable()?;
        let mut records = self.records.write();
        let stored = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(StoreError::NotFound(record.id))?;

        if stored.is_synced() {
            return Err(StoreError::AlreadySynced(record.id));
        }

        stored.status = record.status;
        stored.sync_attempt_count = record.sync_attempt_count;
        stored.last_sync_attempt = record.last_sync_attempt;
        Ok(())
    }
}

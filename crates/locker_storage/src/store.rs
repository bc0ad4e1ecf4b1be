//! Record store trait definition.

use crate::error::StoreResult;
use locker_core::{NewPackage, PackageRecord, PackageStatus};

/// Durable storage for package records.
///
/// # Invariants
///
/// - `create` assigns a fresh local id and stores the record as `pending`
///   with no attempts
/// - `save` updates exactly one record, atomically, and the change is
///   durable once it returns `Ok`
/// - A record persisted as `synced` is never modified by `save`
/// - All listings are ordered by local id
///
/// # Implementors
///
/// - [`super::InMemoryRecordStore`] - For testing
/// - [`super::SqliteRecordStore`] - For persistent storage
pub trait RecordStore: Send + Sync {
    /// Prepares the underlying storage (creates the schema if needed).
    ///
    /// Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be initialized. Callers treat
    /// this as fatal.
    fn init(&self) -> StoreResult<()>;

    /// Creates a new `pending` record.
    ///
    /// # Errors
    ///
    /// Returns [`super::StoreError::DuplicateTrackingId`] if the tracking id
    /// is already stored.
    fn create(&self, package: NewPackage) -> StoreResult<PackageRecord>;

    /// Returns the record with the given local id.
    fn get(&self, id: i64) -> StoreResult<Option<PackageRecord>>;

    /// Returns the record with the given tracking id.
    fn find_by_tracking_id(&self, tracking_id: &str) -> StoreResult<Option<PackageRecord>>;

    /// Returns every record that automatic sync may still attempt:
    /// not synced and fewer than `max_retries` attempts.
    fn list_eligible_for_sync(&self, max_retries: u32) -> StoreResult<Vec<PackageRecord>>;

    /// Returns every record that needs an operator: `failed`, or `pending`
    /// with at least `max_retries` attempts.
    fn list_needing_intervention(&self, max_retries: u32) -> StoreResult<Vec<PackageRecord>>;

    /// Returns every record.
    fn list_all(&self) -> StoreResult<Vec<PackageRecord>>;

    /// Persists the status and attempt bookkeeping of `record`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No record with `record.id` exists
    /// - The persisted record is already `synced`
    /// - The write cannot be made durable
    fn save(&self, record: &PackageRecord) -> StoreResult<()>;

    /// Counts records per status.
    fn status_counts(&self) -> StoreResult<StatusCounts> {
        let mut counts = StatusCounts::default();
        for record in self.list_all()? {
            counts.add(record.status);
        }
        Ok(counts)
    }
}

/// Number of records in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Records waiting for acknowledgement.
    pub pending: usize,
    /// Records acknowledged by the server.
    pub synced: usize,
    /// Records parked for an operator.
    pub failed: usize,
}

impl StatusCounts {
    /// Adds one record with the given status.
    pub fn add(&mut self, status: PackageStatus) {
        match status {
            PackageStatus::Pending => self.pending += 1,
            PackageStatus::Synced => self.synced += 1,
            PackageStatus::Failed => self.failed += 1,
        }
    }

    /// Total number of records.
    pub fn total(&self) -> usize {
        self.pending + self.synced + self.failed
    }
}

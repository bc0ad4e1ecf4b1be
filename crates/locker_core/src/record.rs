//! Package records and their sync status.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sync status of a package record.
///
/// `Pending` is the initial state. `Synced` is terminal: a synced record is
/// never written again. `Failed` is only left through the manual retry
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    /// Waiting to be acknowledged by the server.
    Pending,
    /// Acknowledged by the server.
    Synced,
    /// Parked for operator intervention.
    Failed,
}

impl PackageStatus {
    /// Returns the stored and wire form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Pending => "pending",
            PackageStatus::Synced => "synced",
            PackageStatus::Failed => "failed",
        }
    }

    /// Returns true if the record can never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PackageStatus::Synced)
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "pending" => Ok(PackageStatus::Pending),
            "synced" => Ok(PackageStatus::Synced),
            "failed" => Ok(PackageStatus::Failed),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// One package drop-off event tracked through its sync lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Local identifier assigned by the store.
    pub id: i64,
    /// Globally unique tracking identifier; the server deduplicates on it.
    pub tracking_id: String,
    /// Identifier of the locker that recorded the drop-off.
    pub locker_id: String,
    /// Current sync status.
    pub status: PackageStatus,
    /// When the package was dropped off.
    pub drop_off_timestamp: DateTime<Utc>,
    /// Number of sync attempts started, counted before each send.
    pub sync_attempt_count: u32,
    /// When the most recent attempt started.
    pub last_sync_attempt: Option<DateTime<Utc>>,
}

impl PackageRecord {
    /// Returns true once the server has acknowledged this record.
    pub fn is_synced(&self) -> bool {
        self.status == PackageStatus::Synced
    }

    /// Returns true if automatic sync has given up on this record.
    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        !self.is_synced() && self.sync_attempt_count >= max_retries
    }

    /// Records the start of a new attempt at `now`.
    pub fn begin_attempt(&mut self, now: DateTime<Utc>) {
        self.sync_attempt_count = self.sync_attempt_count.saturating_add(1);
        self.last_sync_attempt = Some(now);
    }

    /// Clears attempt bookkeeping so the record can be retried from scratch.
    pub fn reset_for_retry(&mut self) {
        self.status = PackageStatus::Pending;
        self.sync_attempt_count = 0;
        self.last_sync_attempt = None;
    }
}

/// Input for creating a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPackage {
    /// Tracking identifier for the package.
    pub tracking_id: String,
    /// Locker that received the package.
    pub locker_id: String,
    /// Drop-off time.
    pub drop_off_timestamp: DateTime<Utc>,
}

impl NewPackage {
    /// Creates a new package input with an explicit tracking id.
    pub fn new(
        tracking_id: impl Into<String>,
        locker_id: impl Into<String>,
        drop_off_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            tracking_id: tracking_id.into(),
            locker_id: locker_id.into(),
            drop_off_timestamp,
        }
    }

    /// Creates a new package input with a freshly generated tracking id.
    pub fn generated(locker_id: impl Into<String>, drop_off_timestamp: DateTime<Utc>) -> Self {
        Self::new(generate_tracking_id(), locker_id, drop_off_timestamp)
    }
}

/// Generates a random, collision-resistant tracking id (UUID v4).
pub fn generate_tracking_id() -> String {
    Uuid::new_v4().to_string()
}

//! Configuration for the sync engine.

use crate::backoff::BackoffSchedule;
use crate::error::{SyncError, SyncResult};
use std::time::Duration;

/// Default server endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/sync";

/// Default locker id for development setups.
pub const DEFAULT_LOCKER_ID: &str = "locker-dev";

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Server URL records are POSTed to.
    pub endpoint_url: String,
    /// Id of this locker.
    pub locker_id: String,
    /// Pause between sync passes.
    pub poll_interval: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Attempt ceiling; records at or above it are left for manual retry.
    pub max_retries: u32,
    /// Wait between attempts of the same record.
    pub backoff: BackoffSchedule,
}

impl SyncConfig {
    /// Creates a new sync configuration with default timings.
    pub fn new(endpoint_url: impl Into<String>, locker_id: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            locker_id: locker_id.into(),
            poll_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            max_retries: 5,
            backoff: BackoffSchedule::default(),
        }
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the attempt ceiling.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the backoff schedule.
    pub fn with_backoff(mut self, backoff: BackoffSchedule) -> Self {
        self.backoff = backoff;
        self
    }

    /// Checks that the configuration can drive a sync loop.
    pub fn validate(&self) -> SyncResult<()> {
        let endpoint = self.endpoint_url.trim();
        if endpoint.is_empty() {
            return Err(SyncError::Config("endpoint url is empty".into()));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(SyncError::Config(format!(
                "endpoint url must be http or https: {endpoint}"
            )));
        }
        if self.locker_id.trim().is_empty() {
            return Err(SyncError::Config("locker id is empty".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(SyncError::Config("poll interval must be positive".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(SyncError::Config("request timeout must be positive".into()));
        }
        if self.max_retries == 0 {
            return Err(SyncError::Config("max retries must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, DEFAULT_LOCKER_ID)
    }
}

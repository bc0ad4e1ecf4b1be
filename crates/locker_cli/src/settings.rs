//! Agent settings from flags, environment and `.env`.

use clap::Args;
use locker_sync_engine::{
    BackoffSchedule, SyncConfig, SyncResult, DEFAULT_BACKOFF_SECS, DEFAULT_ENDPOINT,
    DEFAULT_LOCKER_ID,
};
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by every command.
///
/// Each flag falls back to an environment variable, then to a default.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Server URL records are POSTed to
    #[arg(long, global = true, env = "SERVER_SYNC_URL", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Seconds between sync passes
    #[arg(long, global = true, env = "SYNC_INTERVAL_SECONDS", default_value_t = 30)]
    pub interval: u64,

    /// Id of this locker
    #[arg(long, global = true, env = "LOCKER_ID", default_value = DEFAULT_LOCKER_ID)]
    pub locker_id: String,

    /// Path to the SQLite database
    #[arg(long, global = true, env = "SQLITE_PATH", default_value = "./locker.db")]
    pub db: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "SYNC_TIMEOUT_SECONDS", default_value_t = 10)]
    pub timeout: u64,

    /// Attempts before a record waits for retry-failed
    #[arg(long, global = true, env = "SYNC_MAX_RETRIES", default_value_t = 5)]
    pub max_retries: u32,

    /// Seconds to wait after each attempt, comma separated
    #[arg(
        long,
        global = true,
        env = "SYNC_BACKOFF_SECONDS",
        value_delimiter = ',',
        default_values_t = DEFAULT_BACKOFF_SECS
    )]
    pub backoff: Vec<u64>,
}

impl Settings {
    /// Builds and validates the engine configuration.
    pub fn sync_config(&self) -> SyncResult<SyncConfig> {
        let config = SyncConfig::new(self.endpoint.trim(), self.locker_id.trim())
            .with_poll_interval(Duration::from_secs(self.interval))
            .with_request_timeout(Duration::from_secs(self.timeout))
            .with_max_retries(self.max_retries)
            .with_backoff(BackoffSchedule::from_secs(&self.backoff));
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
impl Settings {
    /// Default settings pointing at `db`.
    pub fn for_db(db: PathBuf) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            interval: 30,
            locker_id: "locker-test".to_string(),
            db,
            timeout: 10,
            max_retries: 5,
            backoff: DEFAULT_BACKOFF_SECS.to_vec(),
        }
    }
}

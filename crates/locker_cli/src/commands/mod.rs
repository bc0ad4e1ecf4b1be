//! CLI command implementations.

pub mod drop_off;
pub mod init_db;
pub mod retry;
pub mod run;
pub mod status;
pub mod sync_once;

use crate::settings::Settings;
use locker_storage::SqliteRecordStore;
use locker_sync_engine::{HttpTransport, SyncEngine, SyncResult};
use std::sync::Arc;

/// Engine wired to the SQLite database and the HTTP endpoint in `settings`.
pub type AgentEngine = SyncEngine<SqliteRecordStore, HttpTransport>;

/// Opens the database and builds an engine from `settings`.
pub fn build_engine(settings: &Settings) -> SyncResult<AgentEngine> {
    let config = settings.sync_config()?;
    let store = Arc::new(SqliteRecordStore::open(&settings.db)?);
    let transport = HttpTransport::from_config(&config)?;
    Ok(SyncEngine::new(config, store, transport))
}

//! Database file backup and reset.

use crate::error::StoreResult;
use crate::sqlite::SqliteRecordStore;
use rusqlite::Connection;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Returns the backup location for a database file (`locker.db` →
/// `locker.db.bak`).
#[must_use]
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

/// Writes a consistent snapshot of the database at `path` to `dest`.
///
/// Uses `VACUUM INTO`, so committed data still sitting in the WAL file is
/// included. An existing file at `dest` is replaced.
///
/// # Errors
///
/// Returns an error if `path` is not a readable SQLite database or `dest`
/// cannot be written.
pub fn backup_database(path: &Path, dest: &Path) -> StoreResult<()> {
    if dest.exists() {
        fs::remove_file(dest)?;
    }
    let conn = Connection::open(path)?;
    conn.execute("VACUUM INTO ?1", [dest.to_string_lossy()])?;
    info!(from = %path.display(), to = %dest.display(), "database backup written");
    Ok(())
}

/// Backs up and recreates the database at `path`.
///
/// If a database exists it is snapshotted to [`backup_path_for`] and removed
/// together with its `-wal` and `-shm` side files. A fresh, initialized
/// database is then created. Returns the backup path if one was written.
///
/// # Errors
///
/// Returns an error if the backup, removal or re-creation fails. The old
/// database is only removed after its backup succeeded.
pub fn reset_database(path: &Path) -> StoreResult<Option<PathBuf>> {
    let backup = if path.exists() {
        let backup = backup_path_for(path);
        backup_database(path, &backup)?;
        remove_database_files(path)?;
        info!(path = %path.display(), "removed old database");
        Some(backup)
    } else {
        None
    };

    SqliteRecordStore::open(path)?;
    info!(path = %path.display(), "initialized new database");
    Ok(backup)
}

fn remove_database_files(path: &Path) -> StoreResult<()> {
    fs::remove_file(path)?;
    for suffix in ["-wal", "-shm"] {
        let mut side = OsString::from(path.as_os_str());
        side.push(suffix);
        let side = PathBuf::from(side);
        if side.exists() {
            fs::remove_file(side)?;
        }
    }
    Ok(())
}

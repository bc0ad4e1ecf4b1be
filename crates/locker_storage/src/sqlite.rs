//! SQLite-backed record store for persistent storage.

use crate::error::{StoreError, StoreResult};
use crate::store::RecordStore;
use locker_core::{format_timestamp, parse_timestamp, NewPackage, PackageRecord, PackageStatus};
use parking_lot::Mutex;
use rusqlite::{ffi, params, Connection, OptionalExtension, Params, Row};
use std::path::{Path, PathBuf};
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS packages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tracking_id TEXT NOT NULL UNIQUE,
    locker_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'synced', 'failed')),
    drop_off_timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    sync_attempt_count INTEGER NOT NULL DEFAULT 0,
    last_sync_attempt TEXT
);
CREATE INDEX IF NOT EXISTS idx_packages_status ON packages (status);
";

const COLUMNS: &str = "id, tracking_id, locker_id, status, drop_off_timestamp, \
                       sync_attempt_count, last_sync_attempt";

/// A record store backed by a SQLite database file.
///
/// Data survives process restarts, and several processes (the poller and
/// the manual retry tool) may open the same file.
///
/// # Durability
///
/// - The database runs in WAL mode with `synchronous=NORMAL`
/// - Every `save` is a single-row `UPDATE`, so it is atomic per record
/// - Writers wait up to five seconds for a competing writer's lock
///
/// # Thread Safety
///
/// The connection sits behind a mutex, so the store can be shared across
/// threads.
///
/// # Example
///
/// ```no_run
/// use locker_storage::{RecordStore, SqliteRecordStore};
/// use std::path::Path;
///
/// let store = SqliteRecordStore::open(Path::new("locker.db")).unwrap();
/// let pending = store.list_eligible_for_sync(5).unwrap();
/// ```
#[derive(Debug)]
pub struct SqliteRecordStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Opens or creates a store at the given path and initializes the schema.
    ///
    /// Parent directories are created if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be
    /// created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA busy_timeout=5000;
             PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;

        let store = Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        };
        store.init()?;
        debug!(path = %path.display(), "opened record store");
        Ok(store)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> StoreResult<Self> {
        let store = Self {
            path: None,
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init()?;
        Ok(store)
    }

    /// Returns the database file path, or `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn query<P: Params>(&self, filter: &str, params: P) -> StoreResult<Vec<PackageRecord>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {COLUMNS} FROM packages {filter} ORDER BY id ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, RawRow::read)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_record()?);
        }
        Ok(out)
    }

    fn query_one<P: Params>(&self, filter: &str, params: P) -> StoreResult<Option<PackageRecord>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {COLUMNS} FROM packages {filter}");
        conn.query_row(&sql, params, RawRow::read)
            .optional()?
            .map(RawRow::into_record)
            .transpose()
    }
}

impl RecordStore for SqliteRecordStore {
    fn init(&self) -> StoreResult<()> {
        self.conn.lock().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn create(&self, package: NewPackage) -> StoreResult<PackageRecord> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO packages (tracking_id, locker_id, status, drop_off_timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                package.tracking_id,
                package.locker_id,
                PackageStatus::Pending.as_str(),
                format_timestamp(package.drop_off_timestamp),
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                return Err(StoreError::DuplicateTrackingId(package.tracking_id));
            }
            Err(err) => return Err(err.into()),
        }

        Ok(PackageRecord {
            id: conn.last_insert_rowid(),
            tracking_id: package.tracking_id,
            locker_id: package.locker_id,
            status: PackageStatus::Pending,
            drop_off_timestamp: package.drop_off_timestamp,
            sync_attempt_count: 0,
            last_sync_attempt: None,
        })
    }

    fn get(&self, id: i64) -> StoreResult<Option<PackageRecord>> {
        self.query_one("WHERE id = ?1", [id])
    }

    fn find_by_tracking_id(&self, tracking_id: &str) -> StoreResult<Option<PackageRecord>> {
        self.query_one("WHERE tracking_id = ?1", [tracking_id])
    }

    fn list_eligible_for_sync(&self, max_retries: u32) -> StoreResult<Vec<PackageRecord>> {
        self.query(
            "WHERE status != 'synced' AND sync_attempt_count < ?1",
            [i64::from(max_retries)],
        )
    }

    fn list_needing_intervention(&self, max_retries: u32) -> StoreResult<Vec<PackageRecord>> {
        self.query(
            "WHERE status = 'failed' OR (status = 'pending' AND sync_attempt_count >= ?1)",
            [i64::from(max_retries)],
        )
    }

    fn list_all(&self) -> StoreResult<Vec<PackageRecord>> {
        self.query("", params![])
    }

    fn save(&self, record: &PackageRecord) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE packages
             SET status = ?1, sync_attempt_count = ?2, last_sync_attempt = ?3
             WHERE id = ?4 AND status != 'synced'",
            params![
                record.status.as_str(),
                i64::from(record.sync_attempt_count),
                record.last_sync_attempt.map(format_timestamp),
                record.id,
            ],
        )?;

        if changed == 1 {
            return Ok(());
        }

        let exists: Option<String> = conn
            .query_row(
                "SELECT status FROM packages WHERE id = ?1",
                [record.id],
                |row| row.get(0),
            )
            .optional()?;

        match exists {
            None => Err(StoreError::NotFound(record.id)),
            Some(_) => Err(StoreError::AlreadySynced(record.id)),
        }
    }
}

/// A row as stored, before interpretation.
struct RawRow {
    id: i64,
    tracking_id: String,
    locker_id: String,
    status: String,
    drop_off_timestamp: String,
    sync_attempt_count: i64,
    last_sync_attempt: Option<String>,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tracking_id: row.get(1)?,
            locker_id: row.get(2)?,
            status: row.get(3)?,
            drop_off_timestamp: row.get(4)?,
            sync_attempt_count: row.get(5)?,
            last_sync_attempt: row.get(6)?,
        })
    }

    fn into_record(self) -> StoreResult<PackageRecord> {
        let sync_attempt_count = u32::try_from(self.sync_attempt_count).map_err(|_| {
            StoreError::Corrupted(format!(
                "record {} has attempt count {}",
                self.id, self.sync_attempt_count
            ))
        })?;

        Ok(PackageRecord {
            id: self.id,
            tracking_id: self.tracking_id,
            locker_id: self.locker_id,
            status: self.status.parse()?,
            drop_off_timestamp: parse_timestamp(&self.drop_off_timestamp)?,
            sync_attempt_count,
            last_sync_attempt: self
                .last_sync_attempt
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

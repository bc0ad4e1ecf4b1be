//! # Locker Storage
//!
//! Record store trait and implementations for the locker sync agent.
//!
//! The sync engine only ever talks to a [`RecordStore`]. Stores keep one
//! row per package event and offer append-only creation plus single-record
//! updates of the sync bookkeeping.
//!
//! ## Design Principles
//!
//! - `save` is atomic per record and durable once it returns `Ok`
//! - A record that is persisted as `synced` is never written again
//! - Stores are `Send + Sync` so a store can be shared with the poller
//!
//! ## Available Stores
//!
//! - [`InMemoryRecordStore`] - For testing and ephemeral use
//! - [`SqliteRecordStore`] - Persistent storage in a SQLite file
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use locker_core::NewPackage;
//! use locker_storage::{InMemoryRecordStore, RecordStore};
//!
//! let store = InMemoryRecordStore::new();
//! let record = store.create(NewPackage::new("T1", "locker-a", Utc::now())).unwrap();
//! assert_eq!(record.sync_attempt_count, 0);
//! assert_eq!(store.list_eligible_for_sync(5).unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backup;
mod error;
mod memory;
mod sqlite;
mod store;

pub use backup::{backup_database, backup_path_for, reset_database};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryRecordStore;
pub use sqlite::SqliteRecordStore;
pub use store::{RecordStore, StatusCounts};

//! Database initialization and reset.

use locker_storage::{reset_database, SqliteRecordStore};
use std::path::Path;

/// Creates the schema, or backs up and recreates the database with `reset`.
pub fn run(db: &Path, reset: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !reset {
        SqliteRecordStore::open(db)?;
        println!("✓ Database ready at {}", db.display());
        return Ok(());
    }

    match reset_database(db)? {
        Some(backup) => {
            println!("✓ Database reset at {}", db.display());
            println!("  Backup: {}", backup.display());
        }
        None => println!("✓ Database created at {}", db.display()),
    }
    Ok(())
}

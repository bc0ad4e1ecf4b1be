//! Record a package drop-off.

use crate::settings::Settings;
use chrono::Utc;
use locker_core::NewPackage;
use locker_storage::{RecordStore, SqliteRecordStore};
use tracing::info;

/// Creates a pending record for this locker.
pub fn run(
    settings: &Settings,
    tracking_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let locker_id = settings.locker_id.trim();
    if locker_id.is_empty() {
        return Err("locker id must not be empty".into());
    }

    let now = Utc::now();
    let package = match tracking_id.map(|id| id.trim().to_string()) {
        Some(id) if id.is_empty() => return Err("tracking id must not be empty".into()),
        Some(id) => NewPackage::new(id, locker_id, now),
        None => NewPackage::generated(locker_id, now),
    };

    let store = SqliteRecordStore::open(&settings.db)?;
    let record = store.create(package)?;
    info!(
        id = record.id,
        tracking_id = %record.tracking_id,
        locker_id = %record.locker_id,
        "package dropped off"
    );

    println!("✓ Package recorded");
    println!("  Id:          {}", record.id);
    println!("  Tracking id: {}", record.tracking_id);
    println!("  Locker:      {}", record.locker_id);
    Ok(())
}

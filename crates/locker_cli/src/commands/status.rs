//! Status command implementation.

use crate::settings::Settings;
use locker_core::{format_timestamp, PackageRecord};
use locker_storage::{RecordStore, SqliteRecordStore, StoreResult};
use serde::Serialize;
use std::path::Path;

/// Database status.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Database path.
    pub path: String,
    /// Attempt ceiling in effect.
    pub max_retries: u32,
    /// Records per status.
    pub counts: Counts,
    /// Records that need `retry-failed`.
    pub needing_attention: usize,
    /// Listed records: those needing attention, or all with `--all`.
    pub records: Vec<RecordView>,
}

/// Records per status.
#[derive(Debug, Serialize)]
pub struct Counts {
    /// Pending records.
    pub pending: usize,
    /// Synced records.
    pub synced: usize,
    /// Failed records.
    pub failed: usize,
    /// All records.
    pub total: usize,
}

/// One listed record.
#[derive(Debug, Serialize)]
pub struct RecordView {
    /// Row id.
    pub id: i64,
    /// Tracking id.
    pub tracking_id: String,
    /// Locker id.
    pub locker_id: String,
    /// Status.
    pub status: String,
    /// Drop-off time.
    pub drop_off_timestamp: String,
    /// Attempts made.
    pub sync_attempt_count: u32,
    /// Time of the last attempt.
    pub last_sync_attempt: Option<String>,
    /// True if automatic sync has stopped retrying this record.
    pub exhausted: bool,
}

impl RecordView {
    fn new(record: &PackageRecord, max_retries: u32) -> Self {
        Self {
            id: record.id,
            tracking_id: record.tracking_id.clone(),
            locker_id: record.locker_id.clone(),
            status: record.status.to_string(),
            drop_off_timestamp: format_timestamp(record.drop_off_timestamp),
            sync_attempt_count: record.sync_attempt_count,
            last_sync_attempt: record.last_sync_attempt.map(format_timestamp),
            exhausted: record.is_exhausted(max_retries),
        }
    }
}

/// Runs the status command.
pub fn run(
    settings: &Settings,
    format: &str,
    all: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !settings.db.exists() {
        return Err(format!("No database found at {}", settings.db.display()).into());
    }
    let store = SqliteRecordStore::open(&settings.db)?;
    let report = collect(&store, &settings.db, settings.max_retries, all)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report, all);
        }
    }

    Ok(())
}

/// Gathers the status report from `store`.
pub fn collect<S: RecordStore>(
    store: &S,
    path: &Path,
    max_retries: u32,
    all: bool,
) -> StoreResult<StatusReport> {
    let counts = store.status_counts()?;
    let needing = store.list_needing_intervention(max_retries)?;
    let needing_attention = needing.len();
    let listed = if all { store.list_all()? } else { needing };

    Ok(StatusReport {
        path: path.display().to_string(),
        max_retries,
        counts: Counts {
            pending: counts.pending,
            synced: counts.synced,
            failed: counts.failed,
            total: counts.total(),
        },
        needing_attention,
        records: listed
            .iter()
            .map(|r| RecordView::new(r, max_retries))
            .collect(),
    })
}

fn print_text_output(report: &StatusReport, all: bool) {
    println!("Locker Database Status");
    println!("======================");
    println!();
    println!("Path: {}", report.path);
    println!();
    println!("Records:");
    println!("  Pending: {}", report.counts.pending);
    println!("  Synced:  {}", report.counts.synced);
    println!("  Failed:  {}", report.counts.failed);
    println!("  Total:   {}", report.counts.total);
    println!();
    println!(
        "Needing attention (failed or >= {} attempts): {}",
        report.max_retries, report.needing_attention
    );

    if report.records.is_empty() {
        return;
    }
    println!();
    println!("{}:", if all { "All records" } else { "Needing attention" });
    for r in &report.records {
        println!(
            "  [{}] {} {} attempts={} last={}{}",
            r.id,
            r.tracking_id,
            r.status,
            r.sync_attempt_count,
            r.last_sync_attempt.as_deref().unwrap_or("never"),
            if r.exhausted { " (exhausted)" } else { "" }
        );
    }
}

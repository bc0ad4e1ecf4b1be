//! Single sync pass.

use super::build_engine;
use crate::settings::Settings;
use locker_sync_engine::{AttemptOutcome, RecordOutcome, SyncPassResult};

/// Runs one pass and prints what happened to each record.
pub fn run(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_engine(settings)?;
    let result = engine.sync_once();

    print_summary(&result);

    if let Some(err) = result.listing_error {
        return Err(format!("could not list pending records: {err}").into());
    }
    Ok(())
}

fn print_summary(result: &SyncPassResult) {
    println!("Sync pass ({} ms)", result.duration.as_millis());
    println!("  Examined:       {}", result.examined);
    println!("  Synced:         {}", result.synced);
    println!("  Deferred:       {}", result.deferred);
    println!("  Failed:         {}", result.failed);
    println!("  Storage errors: {}", result.storage_errors);
    println!("  Exhausted:      {}", result.exhausted);

    if !result.outcomes.is_empty() {
        println!();
        for outcome in &result.outcomes {
            println!("  {}", describe(outcome));
        }
    }
    if result.exhausted > 0 {
        println!();
        println!("Some records reached the retry limit; run `locker retry-failed`.");
    }
}

/// One-line description of a record's outcome.
pub fn describe(outcome: &RecordOutcome) -> String {
    let detail = match &outcome.outcome {
        AttemptOutcome::Synced => "synced".to_string(),
        AttemptOutcome::Deferred { eligible_at } => {
            format!("waiting until {}", eligible_at.to_rfc3339())
        }
        AttemptOutcome::AlreadySynced => "already synced".to_string(),
        AttemptOutcome::InvalidAck { reason } => format!("invalid acknowledgement: {reason}"),
        AttemptOutcome::Rejected { status } => format!("rejected with HTTP {status}"),
        AttemptOutcome::TransportFailed { reason, .. } => reason.clone(),
        AttemptOutcome::StorageFailed { reason } => format!("storage error: {reason}"),
    };
    format!(
        "{} (attempt {}): {}",
        outcome.tracking_id, outcome.attempt, detail
    )
}

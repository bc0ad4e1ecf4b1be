//! Manual retry of records that stopped syncing.

use super::build_engine;
use super::sync_once::describe;
use crate::settings::Settings;

/// Resets every failed or exhausted record and sends it immediately.
pub fn run(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_engine(settings)?;
    let report = engine.retry_failed()?;

    if report.candidates == 0 {
        println!("No failed packages to retry.");
        return Ok(());
    }

    println!("Retried {} package(s)", report.candidates);
    for outcome in &report.outcomes {
        println!("  {}", describe(outcome));
    }
    println!();
    println!("  Synced:         {}", report.synced);
    println!(
        "  Still pending:  {}",
        report.candidates - report.synced - report.reset_failures
    );
    if report.reset_failures > 0 {
        println!("  Not reset:      {}", report.reset_failures);
    }
    Ok(())
}

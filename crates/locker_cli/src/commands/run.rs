//! Long-running sync loop.

use super::build_engine;
use crate::settings::Settings;
use locker_sync_engine::{Poller, ShutdownSignal};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use std::sync::Arc;
use tracing::info;

/// Runs the poller until SIGINT or SIGTERM.
///
/// A signal lets the record in flight finish, then stops before the next
/// record or during the sleep between passes.
pub fn run(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = ShutdownSignal::new();
    flag::register(SIGTERM, shutdown.flag())?;
    flag::register(SIGINT, shutdown.flag())?;

    let engine = build_engine(settings)?.with_shutdown(shutdown.clone());
    let interval = engine.config().poll_interval;
    info!(
        version = locker_core::VERSION,
        db = %settings.db.display(),
        "starting locker sync agent"
    );

    let poller = Poller::new(Arc::new(engine), interval, shutdown);
    poller.run()?;

    let stats = poller.engine().stats();
    info!(
        passes = stats.passes,
        synced = stats.synced,
        failures = stats.failures,
        "locker sync agent stopped"
    );
    Ok(())
}

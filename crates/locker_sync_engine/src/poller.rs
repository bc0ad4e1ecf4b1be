//! Fixed-interval sync loop.

use crate::error::{SyncError, SyncResult};
use crate::state::{RetryReport, SyncEngine, SyncPassResult};
use crate::transport::SyncTransport;
use locker_core::Clock;
use locker_storage::RecordStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Shared stop flag for the poller and the engine.
///
/// Clones share the flag. [`ShutdownSignal::flag`] exposes the inner
/// `AtomicBool` so signal handlers can set it directly.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    /// Creates an untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once shutdown was requested.
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns the underlying flag.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// Runs [`SyncEngine::sync_once`] on a fixed interval until shut down.
///
/// The interval is measured from the end of one pass to the start of the
/// next, so passes never overlap.
pub struct Poller<S: RecordStore, T: SyncTransport, C: Clock> {
    engine: Arc<SyncEngine<S, T, C>>,
    interval: Duration,
    shutdown: ShutdownSignal,
}

impl<S: RecordStore, T: SyncTransport, C: Clock> Poller<S, T, C> {
    /// Creates a poller.
    pub fn new(
        engine: Arc<SyncEngine<S, T, C>>,
        interval: Duration,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            engine,
            interval,
            shutdown,
        }
    }

    /// Returns the engine.
    pub fn engine(&self) -> &Arc<SyncEngine<S, T, C>> {
        &self.engine
    }

    /// Initializes storage, then syncs until shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] if storage cannot be initialized.
    /// Failures inside a pass never stop the loop.
    pub fn run(&self) -> SyncResult<()> {
        if let Err(err) = self.engine.store().init() {
            error!(error = %err, "failed to initialize storage");
            return Err(SyncError::Storage(err));
        }

        let config = self.engine.config();
        info!(
            endpoint = %config.endpoint_url,
            locker_id = %config.locker_id,
            interval_secs = self.interval.as_secs(),
            max_retries = config.max_retries,
            "sync poller started"
        );

        while !self.shutdown.is_triggered() {
            let result = self.engine.sync_once();
            log_pass(&result);
            self.sleep();
        }

        info!("sync poller stopped");
        Ok(())
    }

    /// Resets and re-attempts records needing intervention.
    pub fn retry_now(&self) -> SyncResult<RetryReport> {
        self.engine.retry_failed()
    }

    fn sleep(&self) {
        let deadline = Instant::now() + self.interval;
        while !self.shutdown.is_triggered() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

fn log_pass(result: &SyncPassResult) {
    if result.is_idle() {
        debug!("nothing to sync");
        return;
    }
    info!(
        examined = result.examined,
        synced = result.synced,
        deferred = result.deferred,
        failed = result.failed,
        storage_errors = result.storage_errors,
        exhausted = result.exhausted,
        duration_ms = result.duration.as_millis() as u64,
        "sync pass finished"
    );
}

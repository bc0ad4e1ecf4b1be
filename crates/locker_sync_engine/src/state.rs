//! Sync engine: one reconciliation pass and manual retry.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::poller::ShutdownSignal;
use crate::transport::SyncTransport;
use chrono::{DateTime, Utc};
use locker_core::{Clock, PackageRecord, PackageStatus, SystemClock};
use locker_storage::{RecordStore, StoreError};
use locker_sync_protocol::{SyncAck, SyncPayload, ACCEPTED_STATUS};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What happened to one record during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The server acknowledged the record and it is now `synced`.
    Synced,
    /// Backoff has not elapsed; nothing was sent.
    Deferred {
        /// Earliest time the next attempt is allowed.
        eligible_at: DateTime<Utc>,
    },
    /// Another writer marked the record synced first; nothing more to do.
    AlreadySynced,
    /// HTTP 201 without a valid acknowledgement for this record.
    InvalidAck {
        /// Why the acknowledgement was refused.
        reason: String,
    },
    /// The server answered with a status other than 201.
    Rejected {
        /// HTTP status code.
        status: u16,
    },
    /// No response: timeout, refused connection, DNS and the like.
    TransportFailed {
        /// Error description.
        reason: String,
        /// Whether the request hit the timeout.
        timed_out: bool,
    },
    /// The local store could not record the attempt or its result.
    StorageFailed {
        /// Error description.
        reason: String,
    },
}

impl AttemptOutcome {
    fn from_error(err: &SyncError) -> Self {
        match err {
            SyncError::Rejected { status } => AttemptOutcome::Rejected { status: *status },
            SyncError::Protocol(e) => AttemptOutcome::InvalidAck {
                reason: e.to_string(),
            },
            SyncError::Timeout => AttemptOutcome::TransportFailed {
                reason: err.to_string(),
                timed_out: true,
            },
            SyncError::Storage(e) => AttemptOutcome::StorageFailed {
                reason: e.to_string(),
            },
            SyncError::Transport { .. } | SyncError::Config(_) => {
                AttemptOutcome::TransportFailed {
                    reason: err.to_string(),
                    timed_out: false,
                }
            }
        }
    }

    /// Returns true if the record ended up synced by this attempt.
    pub fn is_synced(&self) -> bool {
        matches!(self, AttemptOutcome::Synced)
    }

    /// Returns true if the send went out and the server did not confirm it.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            AttemptOutcome::InvalidAck { .. }
                | AttemptOutcome::Rejected { .. }
                | AttemptOutcome::TransportFailed { .. }
        )
    }

    fn reason(&self) -> Option<String> {
        match self {
            AttemptOutcome::InvalidAck { reason }
            | AttemptOutcome::TransportFailed { reason, .. }
            | AttemptOutcome::StorageFailed { reason } => Some(reason.clone()),
            AttemptOutcome::Rejected { status } => Some(format!("HTTP {status}")),
            _ => None,
        }
    }
}

/// Outcome for a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Row id.
    pub record_id: i64,
    /// Tracking id.
    pub tracking_id: String,
    /// Attempt count after this pass touched the record.
    pub attempt: u32,
    /// What happened.
    pub outcome: AttemptOutcome,
}

/// Result of one [`SyncEngine::sync_once`] pass.
#[derive(Debug, Clone, Default)]
pub struct SyncPassResult {
    /// Records selected for the pass.
    pub examined: usize,
    /// Records confirmed by the server.
    pub synced: usize,
    /// Records skipped because of backoff.
    pub deferred: usize,
    /// Attempts the server did not confirm.
    pub failed: usize,
    /// Attempts that could not be persisted.
    pub storage_errors: usize,
    /// Records stuck at the attempt ceiling, waiting for `retry_failed`.
    pub exhausted: usize,
    /// Set when eligible records could not be listed at all.
    pub listing_error: Option<String>,
    /// True if shutdown was requested before every record was visited.
    pub interrupted: bool,
    /// Per-record outcomes in processing order.
    pub outcomes: Vec<RecordOutcome>,
    /// Wall time of the pass.
    pub duration: Duration,
}

impl SyncPassResult {
    fn push(&mut self, outcome: RecordOutcome) {
        match &outcome.outcome {
            AttemptOutcome::Synced => self.synced += 1,
            AttemptOutcome::Deferred { .. } => self.deferred += 1,
            AttemptOutcome::StorageFailed { .. } => self.storage_errors += 1,
            AttemptOutcome::AlreadySynced => {}
            _ => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Number of records for which an attempt was started.
    pub fn attempted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o.outcome, AttemptOutcome::Deferred { .. }))
            .count()
    }

    /// Returns true if the pass had nothing to do.
    pub fn is_idle(&self) -> bool {
        self.examined == 0 && self.exhausted == 0 && self.listing_error.is_none()
    }
}

/// Result of [`SyncEngine::retry_failed`].
#[derive(Debug, Clone, Default)]
pub struct RetryReport {
    /// Records needing intervention when the retry started.
    pub candidates: usize,
    /// Records confirmed by the server.
    pub synced: usize,
    /// Records whose reset could not be persisted; they were skipped.
    pub reset_failures: usize,
    /// Per-record outcomes.
    pub outcomes: Vec<RecordOutcome>,
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of passes completed.
    pub passes: u64,
    /// Total number of attempts started. Deferred records and records
    /// already synced by another writer are not counted.
    pub attempts: u64,
    /// Total number of records synced.
    pub synced: u64,
    /// Total number of unconfirmed sends.
    pub failures: u64,
    /// Total number of storage failures.
    pub storage_errors: u64,
    /// Time the last pass finished.
    pub last_pass_at: Option<DateTime<Utc>>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// The sync engine delivers pending records to the server.
///
/// Delivery is at-least-once: the attempt is persisted before the network
/// call, and a record only becomes `synced` after the server acknowledged
/// that exact tracking id.
pub struct SyncEngine<S: RecordStore, T: SyncTransport, C: Clock = SystemClock> {
    config: SyncConfig,
    store: Arc<S>,
    transport: Arc<T>,
    clock: C,
    stats: RwLock<SyncStats>,
    shutdown: ShutdownSignal,
}

impl<S: RecordStore, T: SyncTransport> SyncEngine<S, T, SystemClock> {
    /// Creates a new sync engine on the system clock.
    pub fn new(config: SyncConfig, store: Arc<S>, transport: T) -> Self {
        Self::with_clock(config, store, transport, SystemClock)
    }
}

impl<S: RecordStore, T: SyncTransport, C: Clock> SyncEngine<S, T, C> {
    /// Creates a new sync engine on the given clock.
    pub fn with_clock(config: SyncConfig, store: Arc<S>, transport: T, clock: C) -> Self {
        Self {
            config,
            store,
            transport: Arc::new(transport),
            clock,
            stats: RwLock::new(SyncStats::default()),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Stops passes between records once `signal` is triggered.
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = signal;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the record store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Runs one reconciliation pass over every eligible record.
    ///
    /// Never fails: per-record problems end up in the returned outcomes and
    /// a listing failure in [`SyncPassResult::listing_error`].
    pub fn sync_once(&self) -> SyncPassResult {
        let start = Instant::now();
        let mut result = SyncPassResult::default();
        let max_retries = self.config.max_retries;

        match self.store.list_eligible_for_sync(max_retries) {
            Ok(records) => {
                result.examined = records.len();
                for record in records {
                    if self.shutdown.is_triggered() {
                        info!("shutdown requested; ending pass early");
                        result.interrupted = true;
                        break;
                    }
                    let outcome = self.visit(record);
                    result.push(outcome);
                }
            }
            Err(err) => {
                error!(error = %err, "failed to list records for sync");
                result.listing_error = Some(err.to_string());
            }
        }

        result.exhausted = self.count_exhausted();
        result.duration = start.elapsed();
        self.record_pass(&result);
        result
    }

    /// Resets every record needing intervention and attempts it right away.
    ///
    /// # Errors
    ///
    /// Returns an error only if the candidates cannot be listed.
    pub fn retry_failed(&self) -> SyncResult<RetryReport> {
        let candidates = self
            .store
            .list_needing_intervention(self.config.max_retries)?;
        let mut report = RetryReport {
            candidates: candidates.len(),
            ..RetryReport::default()
        };

        if candidates.is_empty() {
            info!("no failed packages to retry");
            return Ok(report);
        }
        info!(count = candidates.len(), "retrying failed packages");

        for mut record in candidates {
            record.reset_for_retry();
            if let Err(err) = self.store.save(&record) {
                error!(
                    tracking_id = %record.tracking_id,
                    error = %err,
                    "failed to reset package; skipping"
                );
                report.reset_failures += 1;
                continue;
            }
            let outcome = self.attempt(record);
            if outcome.outcome.is_synced() {
                report.synced += 1;
            }
            self.record_attempt(&outcome.outcome);
            report.outcomes.push(outcome);
        }

        info!(
            candidates = report.candidates,
            synced = report.synced,
            "retry finished"
        );
        Ok(report)
    }

    fn visit(&self, record: PackageRecord) -> RecordOutcome {
        let now = self.clock.now();
        let backoff = &self.config.backoff;
        if !backoff.is_eligible(record.sync_attempt_count, record.last_sync_attempt, now) {
            let eligible_at = backoff
                .next_eligible_time(record.sync_attempt_count, record.last_sync_attempt)
                .unwrap_or(now);
            debug!(
                tracking_id = %record.tracking_id,
                attempts = record.sync_attempt_count,
                %eligible_at,
                "backoff not elapsed; deferring"
            );
            return RecordOutcome {
                record_id: record.id,
                tracking_id: record.tracking_id,
                attempt: record.sync_attempt_count,
                outcome: AttemptOutcome::Deferred { eligible_at },
            };
        }
        self.attempt(record)
    }

    /// Persists the attempt, then sends. Nothing goes out unless the
    /// incremented count is durable.
    fn attempt(&self, mut record: PackageRecord) -> RecordOutcome {
        record.begin_attempt(self.clock.now());
        let attempt = record.sync_attempt_count;

        let outcome = match self.store.save(&record) {
            Ok(()) => self.deliver(&mut record),
            Err(StoreError::AlreadySynced(_)) => {
                debug!(tracking_id = %record.tracking_id, "already synced elsewhere");
                AttemptOutcome::AlreadySynced
            }
            Err(err) => {
                error!(
                    tracking_id = %record.tracking_id,
                    attempt,
                    error = %err,
                    "failed to record attempt; not sending"
                );
                AttemptOutcome::StorageFailed {
                    reason: err.to_string(),
                }
            }
        };

        RecordOutcome {
            record_id: record.id,
            tracking_id: record.tracking_id,
            attempt,
            outcome,
        }
    }

    fn deliver(&self, record: &mut PackageRecord) -> AttemptOutcome {
        let payload = SyncPayload::encode(record, self.clock.now());
        let ack = match self.exchange(&payload) {
            Ok(ack) => ack,
            Err(err) => {
                warn!(
                    tracking_id = %record.tracking_id,
                    attempt = record.sync_attempt_count,
                    retryable = err.is_retryable(),
                    error = %err,
                    "sync attempt failed"
                );
                return AttemptOutcome::from_error(&err);
            }
        };

        record.status = PackageStatus::Synced;
        match self.store.save(record) {
            Ok(()) | Err(StoreError::AlreadySynced(_)) => {
                info!(
                    tracking_id = %record.tracking_id,
                    attempt = record.sync_attempt_count,
                    server_received_at = ack.server_received_at.as_deref().unwrap_or("-"),
                    "package synced"
                );
                AttemptOutcome::Synced
            }
            Err(err) => {
                error!(
                    tracking_id = %record.tracking_id,
                    error = %err,
                    "server acknowledged but status could not be saved; will resend"
                );
                AttemptOutcome::StorageFailed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn exchange(&self, payload: &SyncPayload) -> SyncResult<SyncAck> {
        let response = self.transport.send(payload)?;
        if response.status != ACCEPTED_STATUS {
            return Err(SyncError::Rejected {
                status: response.status,
            });
        }
        Ok(SyncAck::decode_verified(&response.body, &payload.tracking_id)?)
    }

    fn count_exhausted(&self) -> usize {
        let max_retries = self.config.max_retries;
        match self.store.list_needing_intervention(max_retries) {
            Ok(records) => {
                let exhausted = records
                    .iter()
                    .filter(|r| r.is_exhausted(max_retries))
                    .count();
                if exhausted > 0 {
                    warn!(
                        count = exhausted,
                        max_retries, "packages reached the retry limit; run retry-failed"
                    );
                }
                exhausted
            }
            Err(err) => {
                warn!(error = %err, "failed to count exhausted packages");
                0
            }
        }
    }

    fn record_attempt(&self, outcome: &AttemptOutcome) {
        let mut stats = self.stats.write();
        if !matches!(
            outcome,
            AttemptOutcome::Deferred { .. } | AttemptOutcome::AlreadySynced
        ) {
            stats.attempts += 1;
        }
        match outcome {
            AttemptOutcome::Synced => stats.synced += 1,
            AttemptOutcome::StorageFailed { .. } => stats.storage_errors += 1,
            o if o.is_failure() => stats.failures += 1,
            _ => {}
        }
        if let Some(reason) = outcome.reason() {
            stats.last_error = Some(reason);
        }
    }

    fn record_pass(&self, result: &SyncPassResult) {
        for outcome in &result.outcomes {
            self.record_attempt(&outcome.outcome);
        }
        let mut stats = self.stats.write();
        stats.passes += 1;
        stats.last_pass_at = Some(self.clock.now());
        if let Some(err) = &result.listing_error {
            stats.last_error = Some(err.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffSchedule;
    use crate::transport::{MockReply, MockTransport, TransportResponse};
    use chrono::TimeZone;
    use locker_core::{ManualClock, NewPackage};
    use locker_storage::{InMemoryRecordStore, StoreResult};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn config() -> SyncConfig {
        SyncConfig::new("http://sync.test/sync", "locker-a")
    }

    fn setup(
        transport: MockTransport,
    ) -> (
        SyncEngine<InMemoryRecordStore, MockTransport, ManualClock>,
        ManualClock,
    ) {
        let clock = ManualClock::new(t0());
        let store = Arc::new(InMemoryRecordStore::new());
        let engine = SyncEngine::with_clock(config(), store, transport, clock.clone());
        (engine, clock)
    }

    fn drop_off(engine: &SyncEngine<InMemoryRecordStore, MockTransport, ManualClock>, id: &str) {
        engine
            .store()
            .create(NewPackage::new(id, "locker-a", t0()))
            .unwrap();
    }

    fn record(
        engine: &SyncEngine<InMemoryRecordStore, MockTransport, ManualClock>,
        id: &str,
    ) -> PackageRecord {
        engine.store().find_by_tracking_id(id).unwrap().unwrap()
    }

    #[test]
    fn happy_path_syncs_on_first_attempt() {
        let (engine, _) = setup(MockTransport::acking());
        drop_off(&engine, "T1");

        let result = engine.sync_once();

        assert_eq!(result.examined, 1);
        assert_eq!(result.synced, 1);
        let r = record(&engine, "T1");
        assert_eq!(r.status, PackageStatus::Synced);
        assert_eq!(r.sync_attempt_count, 1);
        assert_eq!(r.last_sync_attempt, Some(t0()));

        let sent = engine.transport().requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].last_sync_attempt, 1);
        assert_eq!(sent[0].status, "pending");
    }

    #[test]
    fn outage_then_recovery_respects_backoff() {
        let transport = MockTransport::new();
        transport.set_default_reply(MockReply::ConnectionError("refused".into()));
        let (engine, clock) = setup(transport);
        drop_off(&engine, "T2");

        let first = engine.sync_once();
        assert_eq!(first.failed, 1);
        assert!(matches!(
            first.outcomes[0].outcome,
            AttemptOutcome::TransportFailed { timed_out: false, .. }
        ));
        assert_eq!(record(&engine, "T2").sync_attempt_count, 1);

        clock.advance(Duration::from_secs(5));
        let early = engine.sync_once();
        assert_eq!(early.deferred, 1);
        assert_eq!(
            early.outcomes[0].outcome,
            AttemptOutcome::Deferred {
                eligible_at: t0() + chrono::Duration::seconds(15)
            }
        );
        assert_eq!(engine.transport().request_count(), 1);

        clock.advance(Duration::from_secs(10));
        engine.sync_once();
        assert_eq!(record(&engine, "T2").sync_attempt_count, 2);

        engine.transport().set_default_reply(MockReply::EchoAck);
        clock.advance(Duration::from_secs(15));
        let recovered = engine.sync_once();
        assert_eq!(recovered.synced, 1);

        let r = record(&engine, "T2");
        assert_eq!(r.status, PackageStatus::Synced);
        assert_eq!(r.sync_attempt_count, 3);
        assert_eq!(engine.transport().requests_for("T2"), 3);
    }

    #[test]
    fn exhausted_record_is_reported_not_sent() {
        let transport = MockTransport::new();
        transport.set_default_reply(MockReply::status(500));
        let (engine, clock) = setup(transport);
        drop_off(&engine, "T3");

        for _ in 0..5 {
            engine.sync_once();
            clock.advance(Duration::from_secs(60));
        }
        assert_eq!(record(&engine, "T3").sync_attempt_count, 5);
        assert_eq!(engine.transport().request_count(), 5);

        let result = engine.sync_once();
        assert_eq!(result.examined, 0);
        assert_eq!(result.exhausted, 1);
        assert_eq!(engine.transport().request_count(), 5);

        let r = record(&engine, "T3");
        assert_eq!(r.status, PackageStatus::Pending);
        assert_eq!(r.sync_attempt_count, 5);
    }

    #[test]
    fn retry_failed_recovers_exhausted_record() {
        let transport = MockTransport::new();
        transport.set_default_reply(MockReply::status(503));
        let (engine, clock) = setup(transport);
        drop_off(&engine, "T3");
        for _ in 0..5 {
            engine.sync_once();
            clock.advance(Duration::from_secs(60));
        }

        engine.transport().set_default_reply(MockReply::EchoAck);
        let report = engine.retry_failed().unwrap();

        assert_eq!(report.candidates, 1);
        assert_eq!(report.synced, 1);
        let r = record(&engine, "T3");
        assert_eq!(r.status, PackageStatus::Synced);
        assert_eq!(r.sync_attempt_count, 1);
        assert_eq!(r.last_sync_attempt, Some(clock.now()));
    }

    #[test]
    fn retry_failed_picks_up_failed_status() {
        let (engine, _) = setup(MockTransport::acking());
        let mut failed = engine
            .store()
            .create(NewPackage::new("T4", "locker-a", t0()))
            .unwrap();
        failed.status = PackageStatus::Failed;
        failed.sync_attempt_count = 2;
        engine.store().save(&failed).unwrap();

        let report = engine.retry_failed().unwrap();

        assert_eq!(report.candidates, 1);
        assert_eq!(report.synced, 1);
        let r = record(&engine, "T4");
        assert!(r.is_synced());
        assert_eq!(r.sync_attempt_count, 1);
    }

    #[test]
    fn retry_failed_with_nothing_to_do() {
        let (engine, _) = setup(MockTransport::acking());
        drop_off(&engine, "T1");

        let report = engine.retry_failed().unwrap();
        assert_eq!(report.candidates, 0);
        assert!(report.outcomes.is_empty());
        assert_eq!(engine.transport().request_count(), 0);
    }

    #[test]
    fn mismatched_ack_is_not_success() {
        let transport = MockTransport::new();
        transport.push_reply(MockReply::ack("SOMEONE-ELSE"));
        let (engine, _) = setup(transport);
        drop_off(&engine, "T5");

        let result = engine.sync_once();

        assert_eq!(result.synced, 0);
        assert_eq!(result.failed, 1);
        assert!(matches!(
            result.outcomes[0].outcome,
            AttemptOutcome::InvalidAck { .. }
        ));
        let r = record(&engine, "T5");
        assert_eq!(r.status, PackageStatus::Pending);
        assert_eq!(r.sync_attempt_count, 1);
    }

    #[test]
    fn created_without_ack_body_is_not_success() {
        let transport = MockTransport::new();
        transport.push_reply(MockReply::status(201));
        transport.push_reply(MockReply::json(201, r#"{"ack": false, "trackingId": "T6"}"#));
        let (engine, clock) = setup(transport);
        drop_off(&engine, "T6");

        assert_eq!(engine.sync_once().failed, 1);
        clock.advance(Duration::from_secs(15));
        assert_eq!(engine.sync_once().failed, 1);
        assert_eq!(record(&engine, "T6").status, PackageStatus::Pending);
    }

    #[test]
    fn unacknowledged_record_stops_at_retry_ceiling() {
        let transport = MockTransport::new();
        transport.set_default_reply(MockReply::json(201, r#"{"ack": false}"#));
        let (engine, clock) = setup(transport);
        drop_off(&engine, "T6");

        for _ in 0..5 {
            assert_eq!(engine.sync_once().failed, 1);
            clock.advance(Duration::from_secs(60));
        }

        let r = record(&engine, "T6");
        assert_eq!(r.sync_attempt_count, engine.config().max_retries);
        assert_eq!(r.status, PackageStatus::Pending);
        assert_eq!(engine.transport().request_count(), 5);

        let sixth = engine.sync_once();
        assert_eq!(sixth.examined, 0);
        assert_eq!(sixth.exhausted, 1);
        assert_eq!(engine.transport().request_count(), 5);
        assert_eq!(record(&engine, "T6").status, PackageStatus::Pending);
    }

    #[test]
    fn non_created_status_is_rejected() {
        let transport = MockTransport::new();
        transport.push_reply(MockReply::json(200, r#"{"ack": true, "trackingId": "T7"}"#));
        let (engine, _) = setup(transport);
        drop_off(&engine, "T7");

        let result = engine.sync_once();
        assert_eq!(
            result.outcomes[0].outcome,
            AttemptOutcome::Rejected { status: 200 }
        );
        assert!(!record(&engine, "T7").is_synced());
    }

    #[test]
    fn timeout_is_reported() {
        let transport = MockTransport::new();
        transport.push_reply(MockReply::Timeout);
        let (engine, _) = setup(transport);
        drop_off(&engine, "T8");

        let result = engine.sync_once();
        assert!(matches!(
            result.outcomes[0].outcome,
            AttemptOutcome::TransportFailed { timed_out: true, .. }
        ));
    }

    #[test]
    fn storage_failure_sends_nothing() {
        let (engine, _) = setup(MockTransport::acking());
        drop_off(&engine, "T9");
        engine.store().set_fail_writes(true);

        let result = engine.sync_once();

        assert_eq!(result.storage_errors, 1);
        assert_eq!(engine.transport().request_count(), 0);
        let r = record(&engine, "T9");
        assert_eq!(r.sync_attempt_count, 0);
        assert_eq!(r.status, PackageStatus::Pending);
    }

    #[test]
    fn one_bad_record_does_not_block_others() {
        let transport = MockTransport::new();
        transport.push_reply(MockReply::status(500));
        transport.set_default_reply(MockReply::EchoAck);
        let (engine, _) = setup(transport);
        drop_off(&engine, "A");
        drop_off(&engine, "B");
        drop_off(&engine, "C");

        let result = engine.sync_once();

        assert_eq!(result.examined, 3);
        assert_eq!(result.failed, 1);
        assert_eq!(result.synced, 2);
        let order: Vec<_> = result.outcomes.iter().map(|o| o.tracking_id.as_str()).collect();
        assert_eq!(order, ["A", "B", "C"]);
        assert!(!record(&engine, "A").is_synced());
    }

    #[test]
    fn synced_records_are_never_resent() {
        let (engine, clock) = setup(MockTransport::acking());
        drop_off(&engine, "T1");

        engine.sync_once();
        clock.advance(Duration::from_secs(3600));
        let again = engine.sync_once();

        assert_eq!(again.examined, 0);
        assert_eq!(engine.transport().request_count(), 1);
    }

    #[test]
    fn empty_backoff_retries_every_pass() {
        let transport = MockTransport::new();
        transport.set_default_reply(MockReply::status(500));
        let clock = ManualClock::new(t0());
        let store = Arc::new(InMemoryRecordStore::new());
        let engine = SyncEngine::with_clock(
            config().with_backoff(BackoffSchedule::none()),
            store,
            transport,
            clock,
        );
        drop_off(&engine, "T1");

        engine.sync_once();
        engine.sync_once();
        assert_eq!(engine.transport().request_count(), 2);
    }

    #[test]
    fn shutdown_stops_between_records() {
        let (engine, _) = setup(MockTransport::acking());
        let signal = ShutdownSignal::new();
        let engine = engine.with_shutdown(signal.clone());
        drop_off(&engine, "T1");
        signal.trigger();

        let result = engine.sync_once();
        assert!(result.interrupted);
        assert!(result.outcomes.is_empty());
        assert_eq!(engine.transport().request_count(), 0);
    }

    #[test]
    fn stats_accumulate() {
        let transport = MockTransport::new();
        transport.push_reply(MockReply::status(500));
        transport.set_default_reply(MockReply::EchoAck);
        let (engine, clock) = setup(transport);
        drop_off(&engine, "T1");

        engine.sync_once();
        clock.advance(Duration::from_secs(15));
        engine.sync_once();

        let stats = engine.stats();
        assert_eq!(stats.passes, 2);
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.synced, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.last_error.as_deref(), Some("HTTP 500"));
        assert_eq!(stats.last_pass_at, Some(clock.now()));
    }

    /// Hands out listings that another writer syncs right afterwards.
    #[derive(Default)]
    struct RacedStore {
        inner: InMemoryRecordStore,
    }

    impl RecordStore for RacedStore {
        fn init(&self) -> StoreResult<()> {
            self.inner.init()
        }

        fn create(&self, package: NewPackage) -> StoreResult<PackageRecord> {
            self.inner.create(package)
        }

        fn get(&self, id: i64) -> StoreResult<Option<PackageRecord>> {
            self.inner.get(id)
        }

        fn find_by_tracking_id(&self, tracking_id: &str) -> StoreResult<Option<PackageRecord>> {
            self.inner.find_by_tracking_id(tracking_id)
        }

        fn list_eligible_for_sync(&self, max_retries: u32) -> StoreResult<Vec<PackageRecord>> {
            let listed = self.inner.list_eligible_for_sync(max_retries)?;
            for record in &listed {
                let mut done = record.clone();
                done.status = PackageStatus::Synced;
                self.inner.save(&done)?;
            }
            Ok(listed)
        }

        fn list_needing_intervention(&self, max_retries: u32) -> StoreResult<Vec<PackageRecord>> {
            self.inner.list_needing_intervention(max_retries)
        }

        fn list_all(&self) -> StoreResult<Vec<PackageRecord>> {
            self.inner.list_all()
        }

        fn save(&self, record: &PackageRecord) -> StoreResult<()> {
            self.inner.save(record)
        }
    }

    #[test]
    fn record_synced_elsewhere_is_skipped_and_not_counted() {
        let store = Arc::new(RacedStore::default());
        store
            .create(NewPackage::new("T1", "locker-a", t0()))
            .unwrap();
        let engine = SyncEngine::with_clock(
            config(),
            store,
            MockTransport::acking(),
            ManualClock::new(t0()),
        );

        let result = engine.sync_once();

        assert_eq!(result.outcomes[0].outcome, AttemptOutcome::AlreadySynced);
        assert_eq!(engine.transport().request_count(), 0);
        let stats = engine.stats();
        assert_eq!(stats.attempts, 0);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.synced, 0);
    }

    /// Checks what the store holds at the moment the request goes out.
    struct InspectingTransport {
        store: Arc<InMemoryRecordStore>,
        seen_counts: parking_lot::Mutex<Vec<u32>>,
    }

    impl SyncTransport for InspectingTransport {
        fn send(&self, payload: &SyncPayload) -> SyncResult<TransportResponse> {
            let stored = self
                .store
                .find_by_tracking_id(&payload.tracking_id)?
                .map(|r| r.sync_attempt_count)
                .unwrap_or_default();
            self.seen_counts.lock().push(stored);
            Err(SyncError::transport_retryable("offline"))
        }
    }

    #[test]
    fn attempt_is_persisted_before_send() {
        let store = Arc::new(InMemoryRecordStore::new());
        store
            .create(NewPackage::new("T1", "locker-a", t0()))
            .unwrap();
        let transport = InspectingTransport {
            store: Arc::clone(&store),
            seen_counts: parking_lot::Mutex::new(Vec::new()),
        };
        let clock = ManualClock::new(t0());
        let engine = SyncEngine::with_clock(config(), store, transport, clock.clone());

        engine.sync_once();
        clock.advance(Duration::from_secs(15));
        engine.sync_once();

        assert_eq!(*engine.transport().seen_counts.lock(), vec![1, 2]);
    }
}

//! Retry backoff policy.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Default wait, in seconds, after each attempt.
pub const DEFAULT_BACKOFF_SECS: [u64; 5] = [15, 15, 20, 30, 60];

/// Ordered wait durations indexed by the attempt just made.
///
/// Entry `k - 1` is the minimum wait after attempt `k`. Once the schedule is
/// exhausted the last (longest) entry applies to every later attempt, so
/// waits never grow past it and never shrink back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    steps: Vec<Duration>,
}

impl BackoffSchedule {
    /// Creates a schedule from explicit steps.
    pub fn new(steps: Vec<Duration>) -> Self {
        Self { steps }
    }

    /// Creates a schedule from whole seconds.
    pub fn from_secs(steps: &[u64]) -> Self {
        Self::new(steps.iter().copied().map(Duration::from_secs).collect())
    }

    /// Creates a schedule that never waits.
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the steps.
    pub fn steps(&self) -> &[Duration] {
        &self.steps
    }

    /// Returns the minimum wait after attempt number `attempt_count`.
    pub fn wait_for(&self, attempt_count: u32) -> Duration {
        let Some(last) = self.steps.last() else {
            return Duration::ZERO;
        };
        attempt_count
            .checked_sub(1)
            .and_then(|index| self.steps.get(index as usize))
            .unwrap_or(last)
            .to_owned()
    }

    /// Returns when the next attempt becomes allowed, or `None` if the
    /// record was never attempted and may go immediately.
    pub fn next_eligible_time(
        &self,
        attempt_count: u32,
        last_attempt: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        let last = last_attempt?;
        let wait = chrono::Duration::from_std(self.wait_for(attempt_count))
            .unwrap_or(chrono::Duration::MAX);
        Some(last.checked_add_signed(wait).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Returns true if a new attempt is allowed at `now`.
    ///
    /// A last attempt lying in the future (the clock moved backwards) counts
    /// as zero elapsed time.
    pub fn is_eligible(
        &self,
        attempt_count: u32,
        last_attempt: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(last) = last_attempt else {
            return true;
        };
        let elapsed = now
            .signed_duration_since(last)
            .to_std()
            .unwrap_or(Duration::ZERO);
        elapsed >= self.wait_for(attempt_count)
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::from_secs(&DEFAULT_BACKOFF_SECS)
    }
}

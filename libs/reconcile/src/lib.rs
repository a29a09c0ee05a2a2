//! Retry bookkeeping for provisioning reconciliation.
//!
//! Naming and UUID translation are pure functions, so retrying them with the
//! same input never helps. What does get retried is the surrounding
//! provisioning step: re-querying the hypervisor for a UUID that has not been
//! assigned yet, or re-running creation after a transient API failure. This
//! crate tracks those retries per request.
//!
//! # Invariants
//!
//! - Failures are counted per key inside a sliding window
//! - A key is exhausted once its count exceeds the retry limit
//! - Backoff grows exponentially with the attempt count and is capped

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Retries for a request have been used up.
    #[error("retries exhausted for {key} after {attempts} attempts: {last_error}")]
    Exhausted {
        key: String,
        attempts: u32,
        last_error: String,
    },
}

/// Retry tracker for failed operations.
#[derive(Debug, Clone)]
pub struct RetryTracker {
    /// Maximum retries per key.
    max_retries: u32,

    /// Retry window duration.
    window: Duration,

    /// Delay before the first retry.
    base_delay: Duration,

    /// Upper bound for any single delay.
    max_delay: Duration,

    /// Tracked failures: key -> (count, first_failure_time).
    failures: BTreeMap<String, (u32, Instant)>,
}

impl Default for RetryTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WINDOW)
    }
}

impl RetryTracker {
    /// Create a new retry tracker.
    pub fn new(max_retries: u32, window: Duration) -> Self {
        Self {
            max_retries,
            window,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            failures: BTreeMap::new(),
        }
    }

    /// Override the backoff bounds.
    #[must_use]
    pub fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay.max(base_delay);
        self
    }

    /// Record a failure for a key.
    ///
    /// Returns true if retries are exhausted.
    pub fn record_failure(&mut self, key: &str) -> bool {
        let now = Instant::now();

        let (count, first) = self.failures.entry(key.to_string()).or_insert((0, now));

        // Reset if outside window
        if now.duration_since(*first) > self.window {
            *count = 0;
            *first = now;
        }

        *count += 1;
        *count > self.max_retries
    }

    /// Number of failures recorded for a key inside the current window.
    pub fn attempts(&self, key: &str) -> u32 {
        match self.failures.get(key) {
            Some((count, first)) if first.elapsed() <= self.window => *count,
            _ => 0,
        }
    }

    /// Check if retries are exhausted for a key.
    pub fn is_exhausted(&self, key: &str) -> bool {
        self.attempts(key) > self.max_retries
    }

    /// Delay to wait before the next attempt for a key.
    ///
    /// Zero before any failure, then `base * 2^(n-1)` capped at the maximum.
    pub fn backoff(&self, key: &str) -> Duration {
        let attempts = self.attempts(key);
        if attempts == 0 {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(attempts - 1).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Build the error returned once a key is exhausted.
    pub fn exhausted_error(&self, key: &str, last_error: impl std::fmt::Display) -> ReconcileError {
        ReconcileError::Exhausted {
            key: key.to_string(),
            attempts: self.attempts(key),
            last_error: last_error.to_string(),
        }
    }

    /// Clear failure tracking for a key (on success).
    pub fn clear(&mut self, key: &str) {
        self.failures.remove(key);
    }

    /// Prune expired entries.
    pub fn prune(&mut self) {
        let now = Instant::now();
        self.failures
            .retain(|_, (_, first)| now.duration_since(*first) <= self.window);
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.failures.len()
    }
}

/// Default retry limit per request.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default retry window.
pub const DEFAULT_RETRY_WINDOW: Duration = Duration::from_secs(10 * 60); // 10 minutes

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default cap on a single retry delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_tracker() {
        let mut tracker = RetryTracker::new(3, Duration::from_secs(60));

        assert!(!tracker.record_failure("talos-test-workers-4f2l8w")); // 1st
        assert!(!tracker.record_failure("talos-test-workers-4f2l8w")); // 2nd
        assert!(!tracker.record_failure("talos-test-workers-4f2l8w")); // 3rd
        assert!(tracker.record_failure("talos-test-workers-4f2l8w")); // 4th - exhausted

        assert!(tracker.is_exhausted("talos-test-workers-4f2l8w"));
        assert!(!tracker.is_exhausted("prod-cluster-workers-xyz789"));

        tracker.clear("talos-test-workers-4f2l8w");
        assert!(!tracker.is_exhausted("talos-test-workers-4f2l8w"));
        assert_eq!(tracker.tracked(), 0);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let mut tracker = RetryTracker::new(10, Duration::from_secs(60))
            .with_backoff(Duration::from_millis(100), Duration::from_millis(500));

        assert_eq!(tracker.backoff("req"), Duration::ZERO);

        tracker.record_failure("req");
        assert_eq!(tracker.backoff("req"), Duration::from_millis(100));

        tracker.record_failure("req");
        assert_eq!(tracker.backoff("req"), Duration::from_millis(200));

        tracker.record_failure("req");
        assert_eq!(tracker.backoff("req"), Duration::from_millis(400));

        tracker.record_failure("req");
        assert_eq!(tracker.backoff("req"), Duration::from_millis(500));

        for _ in 0..40 {
            tracker.record_failure("req");
        }
        assert_eq!(tracker.backoff("req"), Duration::from_millis(500));
    }

    #[test]
    fn test_window_expiry() {
        let mut tracker = RetryTracker::new(1, Duration::ZERO);

        tracker.record_failure("req");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(tracker.attempts("req"), 0);
        assert!(!tracker.is_exhausted("req"));

        tracker.prune();
        assert_eq!(tracker.tracked(), 0);
    }

    #[test]
    fn test_exhausted_error_carries_context() {
        let mut tracker = RetryTracker::new(0, Duration::from_secs(60));
        assert!(tracker.record_failure("req-1"));

        let err = tracker.exhausted_error("req-1", "uuid not yet assigned");
        let message = err.to_string();
        assert!(message.contains("req-1"));
        assert!(message.contains("1 attempts"));
        assert!(message.contains("uuid not yet assigned"));
    }
}

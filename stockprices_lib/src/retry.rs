//! Bounded retry with linear backoff, plus request outcome counters.
//!
//! The fetcher wraps every API call in [`with_retry`]. The helper never loops
//! more than `max_attempts` times and reports how it ended through
//! [`RetryOutcome`] instead of relying on the error type alone.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::sleep;

/// Default attempt budget per ticker.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default backoff unit; the wait after attempt `k` is `k` units.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(15);

/// Attempt budget and backoff for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// Wait applied after failed attempt `attempt` (1-based): `backoff_base * attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(attempt)
    }

    /// Runs `operation` under this policy. See [`with_retry`].
    pub async fn run<F, Fut, T, E, R>(
        &self,
        tracker: &RequestTracker,
        is_retryable: R,
        operation: F,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
    {
        with_retry(
            self.max_retries,
            |attempt| self.delay_after(attempt),
            tracker,
            is_retryable,
            operation,
        )
        .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BACKOFF_BASE)
    }
}

/// How a retried operation ended.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded on attempt `attempts`.
    Success { value: T, attempts: u32 },
    /// Every attempt failed with a retryable error; `error` is the last one.
    Exhausted { error: E, attempts: u32 },
    /// A non-retryable error stopped the loop early.
    Aborted { error: E, attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Aborted { attempts, .. } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Exhausted { error, .. } | Self::Aborted { error, .. } => Err(error),
        }
    }
}

/// Execute an async operation up to `max_attempts` times.
///
/// - `operation` receives the 1-based attempt number.
/// - Errors for which `is_retryable` is false end the loop immediately.
/// - After a retryable failure that is not the last attempt, sleeps
///   `backoff(attempt)` before the next one. No sleep follows the last attempt.
/// - Records all outcomes on the tracker.
pub async fn with_retry<F, Fut, T, E, R, B>(
    max_attempts: u32,
    backoff: B,
    tracker: &RequestTracker,
    is_retryable: R,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    B: Fn(u32) -> Duration,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                tracker.record_success();
                return RetryOutcome::Success {
                    value,
                    attempts: attempt,
                };
            }
            Err(error) if !is_retryable(&error) => {
                tracker.record_failure();
                return RetryOutcome::Aborted {
                    error,
                    attempts: attempt,
                };
            }
            Err(error) => {
                tracker.record_retryable_failure();

                if attempt >= max_attempts {
                    return RetryOutcome::Exhausted {
                        error,
                        attempts: attempt,
                    };
                }

                let wait = backoff(attempt);
                tracker.record_backoff(wait);
                sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

/// Atomic counters tracking API request outcomes across a run.
pub struct RequestTracker {
    pub(crate) requests_made: AtomicU64,
    pub(crate) requests_succeeded: AtomicU64,
    pub(crate) requests_retryable: AtomicU64,
    pub(crate) requests_failed: AtomicU64,
    /// Cumulative backoff time in milliseconds.
    pub(crate) total_backoff_ms: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            requests_made: AtomicU64::new(0),
            requests_succeeded: AtomicU64::new(0),
            requests_retryable: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            total_backoff_ms: AtomicU64::new(0),
        }
    }

    pub fn record_success(&self) {
        self.requests_made.fetch_add(1, Ordering::Relaxed);
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retryable_failure(&self) {
        self.requests_made.fetch_add(1, Ordering::Relaxed);
        self.requests_retryable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.requests_made.fetch_add(1, Ordering::Relaxed);
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backoff(&self, duration: Duration) {
        self.total_backoff_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Snapshot the current counters.
    pub fn summary(&self) -> TrackerSummary {
        TrackerSummary {
            requests_made: self.requests_made.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_retryable: self.requests_retryable.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            total_backoff_secs: self.total_backoff_ms.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of tracker counters for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSummary {
    pub requests_made: u64,
    pub requests_succeeded: u64,
    pub requests_retryable: u64,
    pub requests_failed: u64,
    pub total_backoff_secs: f64,
}

//! Bounded retry with exponential backoff.
//!
//! Transient failures (HTTP 429/500/502/503/504 and connection errors, per
//! [`Error::is_retryable`]) are retried up to a fixed attempt budget with
//! exponential backoff, on idempotent and non-idempotent methods alike.
//! Sleeping goes through the [`Sleeper`] seam so tests can run the policy
//! without wall-clock delays.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::observability::CLIENT_REQUEST_RETRIES;

/// Total attempts per logical request, including the first.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff before the first retry; doubles on each subsequent retry.
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// A source of asynchronous delays.
///
/// The client and the reply poller sleep through this trait rather than
/// calling `tokio::time::sleep` directly, so deterministic tests can
/// substitute an instantaneous implementation.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// The default sleeper, backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A sleeper that returns immediately. Intended for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSleeper;

#[async_trait::async_trait]
impl Sleeper for NoopSleeper {
    async fn sleep(&self, _: Duration) {}
}

/// Retry policy shared by all client operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Creates the default policy: 3 attempts, 500ms initial backoff.
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        }
    }

    /// Sets the total attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the backoff before the first retry.
    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Returns the backoff to sleep after a failed attempt.
    ///
    /// `attempt` is 1-based: the delay after attempt 1 is the initial
    /// backoff, after attempt 2 it doubles, and so on.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is exhausted.
    pub async fn execute<T, F, Fut>(&self, sleeper: &dyn Sleeper, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && err.is_retryable() => {
                    CLIENT_REQUEST_RETRIES.click();
                    sleeper.sleep(self.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::new();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt() {
        let policy = RetryPolicy::new();
        let attempts = AtomicU32::new(0);
        let result: Result<u32> = policy
            .execute(&NoopSleeper, || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(Error::service_unavailable("bad gateway", None))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let policy = RetryPolicy::new();
        let attempts = AtomicU32::new(0);
        let result: Result<u32> = policy
            .execute(&NoopSleeper, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::internal_server("boom", None)) }
            })
            .await;
        assert!(result.unwrap_err().is_server_error());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_fails_immediately() {
        let policy = RetryPolicy::new();
        let attempts = AtomicU32::new(0);
        let result: Result<u32> = policy
            .execute(&NoopSleeper, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::authentication("bad key")) }
            })
            .await;
        assert!(result.unwrap_err().is_authentication());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_is_not_retried() {
        let policy = RetryPolicy::new();
        let attempts = AtomicU32::new(0);
        let result: Result<u32> = policy
            .execute(&NoopSleeper, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::timeout("too slow", Some(30.0))) }
            })
            .await;
        assert!(result.unwrap_err().is_timeout());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

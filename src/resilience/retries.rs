//! Retry logic.
//!
//! # Responsibilities
//! - Re-run a failed operation up to `max_retries` more times
//! - Sleep with exponential backoff between attempts
//! - Report exhaustion as a distinct error carrying the last failure
//!
//! # Design Decisions
//! - Attempts are strictly sequential on the calling task
//! - No per-attempt timeout; the breaker bounds the whole sequence
//! - Every failure is retryable; classification happens after exhaustion

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// All attempts of a retrying call failed.
///
/// Displays as the last underlying error so that the message surfaced to the
/// caller is the dependency's own.
#[derive(Debug, Error)]
#[error("{last}")]
pub struct RetriesExhausted<E> {
    /// Number of attempts made, including the first.
    pub attempts: u32,
    /// The error of the final attempt.
    pub last: E,
}

/// Bounded retry with deterministic exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1_000))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.base_delay_ms))
    }
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Upper bound on attempts for one `run`.
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `operation` until it succeeds or the retry budget is spent.
    ///
    /// `operation` is invoked once per attempt; the counter starts from zero
    /// on every call.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, RetriesExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut retry = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    metrics::record_attempt("success");
                    return Ok(value);
                }
                Err(err) if retry < self.max_retries => {
                    metrics::record_attempt("failure");
                    retry += 1;
                    let delay = calculate_backoff(retry, self.base_delay);
                    tracing::debug!(
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    metrics::record_attempt("failure");
                    let attempts = retry + 1;
                    tracing::warn!(attempts, error = %err, "All retries exhausted");
                    return Err(RetriesExhausted {
                        attempts,
                        last: err,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_four_attempts_with_doubling_delays() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let started = Instant::now();
        let mut attempt_times = Vec::new();

        let result: Result<(), _> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                attempt_times.push(started.elapsed());
                async { Err::<(), _>("API Error") }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 4);
        assert_eq!(err.to_string(), "API Error");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            attempt_times,
            vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(7),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_does_not_wait() {
        let started = Instant::now();
        let value = RetryPolicy::default()
            .run(|| async { Ok::<_, String>(42) })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_mid_sequence() {
        let calls = AtomicU32::new(0);
        let value = RetryPolicy::default()
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("flaky")
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::new(0, Duration::from_secs(1))
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("down") }
            })
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

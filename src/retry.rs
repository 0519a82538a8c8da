//! Bounded retry policy
//!
//! A small policy object (attempt bound + backoff function) shared by every
//! component that owns a transient network operation. Only errors classified
//! as retryable by [`SwapError::is_retryable`] are retried; anything else is
//! returned on the spot.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::errors::SwapError;

/// Delay schedule between attempts
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed(Duration),
    /// base * 2^attempt, capped, with +/- jitter
    Exponential {
        base: Duration,
        max: Duration,
        jitter_factor: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including initial attempt)
    pub max_attempts: u32,
    pub backoff: Backoff,
}

/// Why a retried operation ultimately failed
#[derive(Debug)]
pub struct RetryFailure {
    pub attempts: u32,
    pub error: SwapError,
    /// `true` when every allowed attempt failed with a transient error
    pub exhausted: bool,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn exponential(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Exponential {
                base,
                max,
                jitter_factor: 0.2,
            },
        }
    }

    /// Quote fetching default: 3 attempts, 1s apart
    pub fn quote_default() -> Self {
        Self::fixed(3, Duration::from_millis(1000))
    }

    /// Delay to wait after the given failed attempt (0-indexed)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential {
                base,
                max,
                jitter_factor,
            } => {
                let exp = base.as_millis() as f64 * 2_f64.powi(attempt as i32);
                let capped = exp.min(max.as_millis() as f64);
                let jitter_range = capped * jitter_factor.clamp(0.0, 1.0);
                let jitter = if jitter_range > 0.0 {
                    rand::thread_rng().gen_range(-jitter_range..=jitter_range)
                } else {
                    0.0
                };
                Duration::from_millis((capped + jitter).max(0.0) as u64)
            }
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// bound is reached
    pub async fn run<F, Fut, T>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SwapError>>,
    {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            operation = operation_name,
                            attempts = attempt,
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    warn!(
                        operation = operation_name,
                        error = %err,
                        "Permanent error, not retrying"
                    );
                    return Err(RetryFailure {
                        attempts: attempt,
                        error: err,
                        exhausted: false,
                    });
                }
                Err(err) if attempt >= self.max_attempts => {
                    warn!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %err,
                        "All retry attempts exhausted"
                    );
                    return Err(RetryFailure {
                        attempts: attempt,
                        error: err,
                        exhausted: true,
                    });
                }
                Err(err) => {
                    let backoff = self.delay_for(attempt - 1);
                    debug!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Transient error, backing off before retry"
                    );
                    sleep(backoff).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::quote_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> SwapError {
        SwapError::Transport {
            status: Some(502),
            message: "bad gateway".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::quote_default();
        let started = Instant::now();

        let result: Result<(), _> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;

        let failure = result.unwrap_err();
        assert!(failure.exhausted);
        assert_eq!(failure.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // two fixed waits between three attempts
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2000) && elapsed < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::quote_default()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SwapError::QuoteMalformed("no outAmount".into())) }
            })
            .await;

        let failure = result.unwrap_err();
        assert!(!failure.exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_second_attempt() {
        let calls = AtomicU32::new(0);
        let value = RetryPolicy::quote_default()
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n == 0 { Err(transient()) } else { Ok(42) } }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(100),
                max: Duration::from_millis(1000),
                jitter_factor: 0.0,
            },
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(8), Duration::from_millis(1000));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::fixed(0, Duration::ZERO).max_attempts, 1);
    }
}

//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed attempt is retryable
//! - Execute retries with full-jitter backoff
//! - Enforce the retry budget (`max_retries` per outer call)
//!
//! # Design Decisions
//! - Only connection failures and timeouts are retried; anything else
//!   surfaces on the first attempt
//! - Retries run below the circuit breaker, so the breaker sees one
//!   outcome per outer call no matter how many attempts were made

use std::future::Future;
use std::time::Duration;

use crate::resilience::backoff::full_jitter;

/// Default base delay for the backoff window.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(100);

/// Default upper bound for a single backoff delay.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(10);

/// Errors that can tell whether another attempt might succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Per-client retry budget and backoff window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_backoff: Duration,
    backoff_cap: Duration,
}

impl RetryPolicy {
    /// Allow up to `max_retries` retries with the default backoff window.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_backoff: DEFAULT_BASE_BACKOFF,
            backoff_cap: DEFAULT_BACKOFF_CAP,
        }
    }

    /// Override the backoff window.
    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.base_backoff = base;
        self.backoff_cap = cap;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_backoff(&self) -> Duration {
        self.base_backoff
    }

    pub fn backoff_cap(&self) -> Duration {
        self.backoff_cap
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        full_jitter(attempt, self.base_backoff, self.backoff_cap)
    }

    /// Whether another attempt is allowed after `retries_done` retries.
    pub fn should_retry<E: Retryable>(&self, retries_done: u32, error: &E) -> bool {
        retries_done < self.max_retries && error.is_retryable()
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget is spent. The last error is returned unchanged.
pub async fn with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    service: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut retries_done = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !policy.should_retry(retries_done, &error) {
                    return Err(error);
                }

                let delay = policy.delay_for(retries_done);
                retries_done += 1;
                tracing::warn!(
                    service = %service,
                    attempt = retries_done,
                    max_retries = policy.max_retries,
                    delay = ?delay,
                    error = %error,
                    "Retrying after transport failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

//! Circuit breaker for service protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: service assumed down, calls fail fast
//! - Half-Open: a single trial call probes for recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= fail_max
//! Open → Half-Open: reset_timeout elapsed since opening
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails (or is cancelled)
//! ```
//!
//! # Design Decisions
//! - One breaker per service, shared by every client of that service
//! - The lock covers state checks and transitions only; the wrapped call
//!   runs outside it
//! - Admission hands out a [`Permit`]; outcomes are reported through it
//! - Every transition bumps a generation counter so outcomes from permits
//!   issued before the transition are ignored

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::observability::metrics;

/// Default consecutive failure threshold.
pub const DEFAULT_FAIL_MAX: u32 = 5;

/// Default cooldown before a trial call is allowed.
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for a single breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    pub fail_max: u32,
    /// Time the circuit stays open before a trial call.
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            fail_max: DEFAULT_FAIL_MAX,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
        }
    }
}

/// Returned instead of running the call while the circuit is open.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("circuit breaker for '{service}' is open (retry after {retry_after:?})")]
pub struct CircuitOpenError {
    pub service: String,
    /// Time left until a trial call is allowed. Zero while a trial is in flight.
    pub retry_after: Duration,
}

/// Point-in-time view of a breaker, for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub retry_after: Option<Duration>,
}

#[derive(Debug)]
struct BreakerState {
    current: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    generation: u64,
}

/// Per-service circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    service: String,
    config: BreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            service: service.into(),
            config,
            state: Mutex::new(BreakerState {
                current: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
                generation: 0,
            }),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Run `action` under breaker protection.
    ///
    /// Any `Err` from the action counts as one failure; `Ok` counts as one
    /// success. While the circuit is open the action is not run and the
    /// rejection is converted into `E`.
    ///
    /// # Errors
    /// Returns the action's error, or `E::from(CircuitOpenError)` when the
    /// call was rejected.
    pub async fn call<F, Fut, T, E>(&self, action: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError>,
    {
        let permit = self.try_acquire()?;

        match action().await {
            Ok(value) => {
                permit.succeed();
                Ok(value)
            }
            Err(error) => {
                permit.fail();
                Err(error)
            }
        }
    }

    /// Ask for admission of one call.
    ///
    /// # Errors
    /// Returns [`CircuitOpenError`] while the cooldown runs or while the
    /// half-open trial is in flight.
    pub fn try_acquire(&self) -> Result<Permit<'_>, CircuitOpenError> {
        let mut state = self.state.lock();

        match state.current {
            CircuitState::Closed => Ok(Permit::new(self, state.generation, false)),
            CircuitState::HalfOpen => Err(self.rejection(Duration::ZERO)),
            CircuitState::Open => {
                let elapsed = state
                    .opened_at
                    .map_or(self.config.reset_timeout, |opened_at| opened_at.elapsed());

                if elapsed < self.config.reset_timeout {
                    return Err(self.rejection(self.config.reset_timeout - elapsed));
                }

                self.transition(&mut state, CircuitState::HalfOpen);
                Ok(Permit::new(self, state.generation, true))
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state.lock().current
    }

    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.state.lock();
        let retry_after = match (state.current, state.opened_at) {
            (CircuitState::Open, Some(opened_at)) => {
                Some(self.config.reset_timeout.saturating_sub(opened_at.elapsed()))
            }
            _ => None,
        };

        BreakerSnapshot {
            state: state.current,
            failure_count: state.failure_count,
            retry_after,
        }
    }

    /// Force the circuit closed.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if state.current != CircuitState::Closed {
            self.transition(&mut state, CircuitState::Closed);
        }
        state.failure_count = 0;
    }

    fn on_success(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }

        match state.current {
            CircuitState::Closed => state.failure_count = 0,
            CircuitState::HalfOpen => self.transition(&mut state, CircuitState::Closed),
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }

        match state.current {
            CircuitState::Closed => {
                state.failure_count += 1;
                tracing::debug!(
                    service = %self.service,
                    failures = state.failure_count,
                    fail_max = self.config.fail_max,
                    "Circuit breaker recorded failure"
                );
                if state.failure_count >= self.config.fail_max {
                    self.transition(&mut state, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => self.transition(&mut state, CircuitState::Open),
            CircuitState::Open => {}
        }
    }

    fn transition(&self, state: &mut BreakerState, to: CircuitState) {
        let from = state.current;
        state.current = to;
        state.generation = state.generation.wrapping_add(1);

        match to {
            CircuitState::Open => {
                state.opened_at = Some(Instant::now());
                state.failure_count = 0;
                tracing::warn!(
                    service = %self.service,
                    from = %from,
                    reset_timeout = ?self.config.reset_timeout,
                    "Circuit breaker opened"
                );
            }
            CircuitState::HalfOpen => {
                tracing::info!(
                    service = %self.service,
                    "Circuit breaker half-open, allowing trial call"
                );
            }
            CircuitState::Closed => {
                state.opened_at = None;
                state.failure_count = 0;
                tracing::info!(service = %self.service, from = %from, "Circuit breaker closed");
            }
        }

        metrics::record_breaker_state(&self.service, to);
    }

    fn rejection(&self, retry_after: Duration) -> CircuitOpenError {
        CircuitOpenError {
            service: self.service.clone(),
            retry_after,
        }
    }
}

/// Admission ticket for one call through a breaker.
///
/// Report the outcome with [`Permit::succeed`] or [`Permit::fail`]. A trial
/// permit dropped without an outcome counts as a failed trial.
#[must_use = "report the call outcome through the permit"]
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    trial: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, generation: u64, trial: bool) -> Self {
        Self {
            breaker,
            generation,
            trial,
            settled: false,
        }
    }

    /// Whether this permit is the half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn succeed(mut self) {
        self.settled = true;
        self.breaker.on_success(self.generation);
    }

    pub fn fail(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.generation);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            tracing::warn!(
                service = %self.breaker.service,
                "Trial call abandoned, reopening circuit"
            );
            self.breaker.on_failure(self.generation);
        }
    }
}

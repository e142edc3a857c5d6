//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a service:
//!     → circuit_breaker.rs (admit or reject, record the outcome)
//!     → retries.rs (retry transport failures with backoff.rs delays)
//!     → timeouts.rs (deadline for each attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound call has a deadline
//! - Retries sit below the breaker; the breaker sees one outcome per call
//! - Breaker state is per service, never global

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{
    BreakerConfig, BreakerSnapshot, CircuitBreaker, CircuitOpenError, CircuitState, Permit,
};
pub use retries::{with_retry, RetryPolicy, Retryable};

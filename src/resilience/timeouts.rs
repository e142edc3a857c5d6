//! Timeout enforcement.
//!
//! # Responsibilities
//! - Give every outbound call a deadline
//! - Fill in the client's default when the caller supplies none
//!
//! # Design Decisions
//! - The deadline is applied per attempt by the HTTP transport, so a retried
//!   call gets a fresh deadline for each attempt
//! - Timeout errors are distinct from connection errors

use std::time::Duration;

/// Default per-attempt deadline for a resilient client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Resolve the deadline for a call.
pub fn effective_timeout(requested: Option<Duration>, default: Duration) -> Duration {
    requested.unwrap_or(default)
}

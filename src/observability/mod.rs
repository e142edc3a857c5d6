//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Resilient client and breakers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (failure counters, breaker state gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every failure is both logged and counted
//! - Metrics are cheap (atomic increments behind the `metrics` facade)

pub mod logging;
pub mod metrics;

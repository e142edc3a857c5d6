//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the `send(name)` sink the resilient client reports failures to
//! - Forward failure counters and breaker state to the `metrics` facade
//! - Expose a Prometheus-compatible scrape endpoint when enabled
//!
//! # Metrics
//! - `circuitbreaker.<service>.<kind>` (counter): one increment per failed
//!   call, kind is `connection_error`, `timeout`, `breaker_open` or `error`
//! - `circuit_breaker_state` (gauge, label `service`): 0=closed,
//!   1=half-open, 2=open
//!
//! # Design Decisions
//! - Sinks are fire-and-forget; nothing reads a return value
//! - The sink is a trait object so tests can record what was sent

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::circuit_breaker::CircuitState;

/// Destination for failure counters.
pub trait MetricSink: Send + Sync {
    /// Increment the counter called `name`.
    fn send(&self, name: &str);
}

/// Sink that increments a counter in the globally installed recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterSink;

impl MetricSink for CounterSink {
    fn send(&self, name: &str) {
        ::metrics::counter!(name.to_owned()).increment(1);
    }
}

/// Publish the current state of a service's breaker.
pub fn record_breaker_state(service: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    ::metrics::gauge!("circuit_breaker_state", "service" => service.to_owned()).set(value);
}

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
/// Fails when a recorder is already installed or the listener cannot be set up.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

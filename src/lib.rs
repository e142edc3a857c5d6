//! Resilient client for named HTTP services.
//!
//! Every call goes through a per-service circuit breaker, retries
//! connection failures and timeouts with full-jitter backoff, and reports
//! failures as logs and metrics instead of errors.
//!
//! ```rust,no_run
//! use resilient_client::{RequestOptions, ResilienceConfig, ServiceRegistry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ServiceRegistry::from_config(&ResilienceConfig::default())?;
//! let client = registry.client("recommendations")?.with_max_retries(3);
//!
//! match client.get(RequestOptions::new()).await {
//!     Some(response) => println!("status {}", response.status()),
//!     None => println!("recommendations unavailable, using defaults"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod observability;
pub mod resilience;
pub mod services;

pub use client::{ClientError, FailureKind, RequestBody, RequestOptions, ResilientClient};
pub use config::ResilienceConfig;
pub use observability::metrics::MetricSink;
pub use resilience::{BreakerConfig, CircuitBreaker, CircuitOpenError, CircuitState, RetryPolicy};
pub use services::{RegistryError, ServiceEndpoint, ServiceRegistry};

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::circuit_breaker::{BreakerConfig, DEFAULT_FAIL_MAX, DEFAULT_RESET_TIMEOUT};
use crate::resilience::retries::{RetryPolicy, DEFAULT_BACKOFF_CAP, DEFAULT_BASE_BACKOFF};
use crate::resilience::timeouts::DEFAULT_REQUEST_TIMEOUT;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Defaults for every resilient client.
    pub client: ClientConfig,

    /// Breaker thresholds applied to services without overrides.
    pub breaker: BreakerDefaults,

    /// Service registry entries.
    pub services: Vec<ServiceConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        let services = [
            ("authentication", "http://authentication:8000/authenticate"),
            ("recommendations", "http://recommendations:8002/recommendations"),
            ("popular", "http://popular:8003/popular_items"),
            ("settings", "http://settings:8004/settings"),
            ("metrics", "http://metrics:8005/metrics"),
        ]
        .into_iter()
        .map(|(name, url)| ServiceConfig {
            name: name.to_string(),
            url: url.to_string(),
            fail_max: None,
            reset_timeout_secs: None,
        })
        .collect();

        Self {
            client: ClientConfig::default(),
            breaker: BreakerDefaults::default(),
            services,
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Per-client knobs.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Deadline per attempt in milliseconds.
    pub timeout_ms: u64,

    /// Retry budget. Absent means a single attempt.
    pub max_retries: Option<u32>,

    /// Base of the full-jitter backoff window in milliseconds.
    pub base_backoff_ms: u64,

    /// Upper bound of a single backoff delay in milliseconds.
    pub backoff_cap_ms: u64,

    /// Route calls through the per-service circuit breakers.
    pub circuit_breakers: bool,

    /// Treat 5xx responses as failed calls.
    pub trip_on_server_error: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            max_retries: None,
            base_backoff_ms: DEFAULT_BASE_BACKOFF.as_millis() as u64,
            backoff_cap_ms: DEFAULT_BACKOFF_CAP.as_millis() as u64,
            circuit_breakers: true,
            trip_on_server_error: false,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        self.max_retries.map(|max_retries| {
            RetryPolicy::new(max_retries).with_backoff(
                Duration::from_millis(self.base_backoff_ms),
                Duration::from_millis(self.backoff_cap_ms),
            )
        })
    }
}

/// Breaker thresholds shared by all services.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BreakerDefaults {
    /// Consecutive failures before opening.
    pub fail_max: u32,

    /// Cooldown in seconds before a trial call.
    pub reset_timeout_secs: u64,
}

impl Default for BreakerDefaults {
    fn default() -> Self {
        Self {
            fail_max: DEFAULT_FAIL_MAX,
            reset_timeout_secs: DEFAULT_RESET_TIMEOUT.as_secs(),
        }
    }
}

/// A named remote service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Unique service name.
    pub name: String,

    /// Base URL every verb is sent to.
    pub url: String,

    /// Override of `breaker.fail_max`.
    #[serde(default)]
    pub fail_max: Option<u32>,

    /// Override of `breaker.reset_timeout_secs`.
    #[serde(default)]
    pub reset_timeout_secs: Option<u64>,
}

impl ServiceConfig {
    /// Resolve this service's breaker thresholds against the defaults.
    pub fn breaker_config(&self, defaults: &BreakerDefaults) -> BreakerConfig {
        BreakerConfig {
            fail_max: self.fail_max.unwrap_or(defaults.fail_max),
            reset_timeout: Duration::from_secs(
                self.reset_timeout_secs.unwrap_or(defaults.reset_timeout_secs),
            ),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

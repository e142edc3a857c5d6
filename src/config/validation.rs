//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check service names are present and unique
//! - Validate URLs and value ranges (timeouts > 0, thresholds > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResilienceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ResilienceConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("service at index {0} has an empty name")]
    EmptyServiceName(usize),

    #[error("service '{0}' is defined more than once")]
    DuplicateService(String),

    #[error("service '{name}' has invalid URL '{url}': {reason}")]
    InvalidUrl { name: String, url: String, reason: String },

    #[error("{field} must be greater than zero")]
    Zero { field: String },

    #[error("client.base_backoff_ms ({base}) exceeds client.backoff_cap_ms ({cap})")]
    BackoffWindow { base: u64, cap: u64 },

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.client.timeout_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "client.timeout_ms".into(),
        });
    }
    if config.client.base_backoff_ms > config.client.backoff_cap_ms {
        errors.push(ValidationError::BackoffWindow {
            base: config.client.base_backoff_ms,
            cap: config.client.backoff_cap_ms,
        });
    }
    if config.breaker.fail_max == 0 {
        errors.push(ValidationError::Zero {
            field: "breaker.fail_max".into(),
        });
    }
    if config.breaker.reset_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "breaker.reset_timeout_secs".into(),
        });
    }

    let mut seen = HashSet::new();
    for (index, service) in config.services.iter().enumerate() {
        if service.name.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceName(index));
        } else if !seen.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        if let Err(reason) = check_url(&service.url) {
            errors.push(ValidationError::InvalidUrl {
                name: service.name.clone(),
                url: service.url.clone(),
                reason,
            });
        }

        if service.fail_max == Some(0) {
            errors.push(ValidationError::Zero {
                field: format!("services.{}.fail_max", service.name),
            });
        }
        if service.reset_timeout_secs == Some(0) {
            errors.push(ValidationError::Zero {
                field: format!("services.{}.reset_timeout_secs", service.name),
            });
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

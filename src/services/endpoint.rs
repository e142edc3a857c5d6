//! Static service endpoint.

use url::Url;

use crate::resilience::circuit_breaker::BreakerConfig;

/// A named remote service and the breaker thresholds guarding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Unique service name.
    pub name: String,
    /// Base URL every verb is sent to.
    pub url: Url,
    /// Thresholds for this service's breaker.
    pub breaker: BreakerConfig,
}

impl ServiceEndpoint {
    pub fn new(name: impl Into<String>, url: Url, breaker: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            url,
            breaker,
        }
    }
}

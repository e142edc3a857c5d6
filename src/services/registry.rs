//! Service registry.
//!
//! # Responsibilities
//! - Map service names to endpoints (immutable after startup)
//! - Own exactly one circuit breaker per service, created on first use
//! - Hand out resilient clients that share those breakers
//!
//! # Design Decisions
//! - One registry can be installed as the process-wide instance; tests
//!   build their own isolated registries instead
//! - The HTTP connection pool is shared by every client built here

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use url::Url;

use crate::client::ResilientClient;
use crate::config::schema::{ClientConfig, ResilienceConfig};
use crate::observability::metrics::{CounterSink, MetricSink};
use crate::resilience::circuit_breaker::{BreakerConfig, BreakerSnapshot, CircuitBreaker};
use crate::services::endpoint::ServiceEndpoint;

static GLOBAL: OnceLock<ServiceRegistry> = OnceLock::new();

/// Errors raised while building or querying the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("service '{0}' is already registered")]
    DuplicateService(String),

    #[error("invalid URL for service '{name}': {source}")]
    InvalidUrl {
        name: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("a global service registry is already installed")]
    AlreadyInstalled,

    #[error("no global service registry is installed")]
    NotInstalled,
}

/// Process-wide map of services and their breakers.
pub struct ServiceRegistry {
    endpoints: HashMap<String, ServiceEndpoint>,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    client_config: ClientConfig,
    http: reqwest::Client,
    metrics: Arc<dyn MetricSink>,
}

impl ServiceRegistry {
    /// Create an empty registry whose clients use `client_config` defaults.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be initialized.
    pub fn new(client_config: ClientConfig) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            endpoints: HashMap::new(),
            breakers: DashMap::new(),
            client_config,
            http,
            metrics: Arc::new(CounterSink),
        })
    }

    /// Build a registry from validated configuration.
    ///
    /// # Errors
    /// Fails on duplicate names, unparsable URLs, or HTTP client setup.
    pub fn from_config(config: &ResilienceConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new(config.client.clone())?;
        for service in &config.services {
            registry = registry.with_service(
                &service.name,
                &service.url,
                service.breaker_config(&config.breaker),
            )?;
        }

        tracing::info!(services = registry.endpoints.len(), "Service registry initialized");
        Ok(registry)
    }

    /// Register a service.
    ///
    /// # Errors
    /// Fails if the name is taken or the URL does not parse.
    pub fn with_service(
        mut self,
        name: &str,
        url: &str,
        breaker: BreakerConfig,
    ) -> Result<Self, RegistryError> {
        if self.endpoints.contains_key(name) {
            return Err(RegistryError::DuplicateService(name.to_string()));
        }

        let url = Url::parse(url).map_err(|source| RegistryError::InvalidUrl {
            name: name.to_string(),
            source,
        })?;
        self.endpoints.insert(name.to_string(), ServiceEndpoint::new(name, url, breaker));
        Ok(self)
    }

    /// Replace the metric sink handed to clients.
    pub fn with_metric_sink(mut self, metrics: Arc<dyn MetricSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replace the shared HTTP client.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Look up a service.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownService`] for unregistered names.
    pub fn endpoint(&self, name: &str) -> Result<&ServiceEndpoint, RegistryError> {
        self.endpoints
            .get(name)
            .ok_or_else(|| RegistryError::UnknownService(name.to_string()))
    }

    /// All registered services, sorted by name.
    pub fn endpoints(&self) -> Vec<&ServiceEndpoint> {
        let mut endpoints: Vec<_> = self.endpoints.values().collect();
        endpoints.sort_by(|a, b| a.name.cmp(&b.name));
        endpoints
    }

    /// The breaker for a service, created on first request.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownService`] for unregistered names.
    pub fn breaker(&self, name: &str) -> Result<Arc<CircuitBreaker>, RegistryError> {
        if let Some(breaker) = self.breakers.get(name) {
            return Ok(breaker.value().clone());
        }

        let endpoint = self.endpoint(name)?;
        let breaker = self
            .breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(
                    service = %name,
                    fail_max = endpoint.breaker.fail_max,
                    "Creating circuit breaker"
                );
                Arc::new(CircuitBreaker::new(name, endpoint.breaker))
            })
            .value()
            .clone();
        Ok(breaker)
    }

    /// Build a client for a service with the registry's defaults.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownService`] for unregistered names.
    pub fn client(&self, name: &str) -> Result<ResilientClient, RegistryError> {
        ResilientClient::new(self, name)
    }

    /// Breaker state of every registered service, sorted by name.
    pub fn snapshots(&self) -> Vec<(String, BreakerSnapshot)> {
        self.endpoints()
            .into_iter()
            .filter_map(|endpoint| {
                self.breaker(&endpoint.name)
                    .ok()
                    .map(|breaker| (endpoint.name.clone(), breaker.snapshot()))
            })
            .collect()
    }

    pub fn client_config(&self) -> &ClientConfig {
        &self.client_config
    }

    pub(crate) fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn metric_sink(&self) -> Arc<dyn MetricSink> {
        self.metrics.clone()
    }

    /// Make this registry the process-wide instance.
    ///
    /// # Errors
    /// Returns [`RegistryError::AlreadyInstalled`] if one was installed before.
    pub fn install(self) -> Result<&'static ServiceRegistry, RegistryError> {
        GLOBAL.set(self).map_err(|_| RegistryError::AlreadyInstalled)?;
        GLOBAL.get().ok_or(RegistryError::AlreadyInstalled)
    }

    /// The process-wide registry, if one was installed.
    pub fn global() -> Option<&'static ServiceRegistry> {
        GLOBAL.get()
    }

    /// Client for `service` from the process-wide registry.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotInstalled`] before [`install`](Self::install),
    /// or [`RegistryError::UnknownService`] for unregistered names.
    pub fn global_client(service: &str) -> Result<ResilientClient, RegistryError> {
        Self::global().ok_or(RegistryError::NotInstalled)?.client(service)
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.endpoints.keys().collect::<Vec<_>>())
            .field("breakers", &self.breakers.len())
            .field("client_config", &self.client_config)
            .finish()
    }
}

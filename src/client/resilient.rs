//! Resilient per-service client.
//!
//! # Responsibilities
//! - Issue GET/POST/DELETE to a registered service's base URL
//! - Pass every call through the service's circuit breaker
//! - Retry transport failures below the breaker
//! - Classify, log and count failures, returning `None` instead of an error
//!
//! # Design Decisions
//! - Fail soft: callers see `None` and apply their own fallback
//! - The failure class survives only in logs and metrics

use reqwest::{Method, Response};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::client::error::{ClientError, FailureKind};
use crate::client::request::{RequestBody, RequestOptions};
use crate::observability::metrics::MetricSink;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::retries::{with_retry, RetryPolicy};
use crate::resilience::timeouts::effective_timeout;
use crate::services::registry::{RegistryError, ServiceRegistry};

/// One outer call, bound and ready to be attempted.
struct OutboundCall {
    method: Method,
    body: Option<RequestBody>,
    options: RequestOptions,
    timeout: Duration,
}

/// Fail-soft HTTP client for one named service.
#[derive(Clone)]
pub struct ResilientClient {
    service: String,
    url: Url,
    breaker: Option<Arc<CircuitBreaker>>,
    timeout: Duration,
    retry: Option<RetryPolicy>,
    backoff_window: (Duration, Duration),
    trip_on_server_error: bool,
    http: reqwest::Client,
    metrics: Arc<dyn MetricSink>,
}

impl ResilientClient {
    /// Build a client for `service` using the registry's shared breaker,
    /// connection pool, metric sink and client defaults.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownService`] for unregistered names.
    pub fn new(registry: &ServiceRegistry, service: &str) -> Result<Self, RegistryError> {
        let endpoint = registry.endpoint(service)?;
        let config = registry.client_config();
        let breaker = if config.circuit_breakers {
            Some(registry.breaker(service)?)
        } else {
            None
        };

        Ok(Self {
            service: endpoint.name.clone(),
            url: endpoint.url.clone(),
            breaker,
            timeout: config.timeout(),
            retry: config.retry_policy(),
            backoff_window: (
                Duration::from_millis(config.base_backoff_ms),
                Duration::from_millis(config.backoff_cap_ms),
            ),
            trip_on_server_error: config.trip_on_server_error,
            http: registry.http_client().clone(),
            metrics: registry.metric_sink(),
        })
    }

    /// Override the default per-attempt deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow up to `max_retries` retries of transport failures.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        let (base, cap) = self.backoff_window;
        self.retry = Some(RetryPolicy::new(max_retries).with_backoff(base, cap));
        self
    }

    /// Replace the retry policy; `None` makes exactly one attempt per call.
    pub fn with_retry_policy(mut self, policy: Option<RetryPolicy>) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_metric_sink(mut self, metrics: Arc<dyn MetricSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    /// The shared breaker, absent when breakers are disabled.
    pub fn breaker(&self) -> Option<&Arc<CircuitBreaker>> {
        self.breaker.as_ref()
    }

    pub async fn get(&self, options: RequestOptions) -> Option<Response> {
        self.request(Method::GET, None, options).await
    }

    pub async fn post(
        &self,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Option<Response> {
        self.request(Method::POST, body, options).await
    }

    pub async fn delete(&self, options: RequestOptions) -> Option<Response> {
        self.request(Method::DELETE, None, options).await
    }

    async fn request(
        &self,
        method: Method,
        body: Option<RequestBody>,
        mut options: RequestOptions,
    ) -> Option<Response> {
        let timeout = effective_timeout(options.timeout, self.timeout);
        let request_id = options.ensure_request_id();
        let call = OutboundCall {
            method,
            body,
            options,
            timeout,
        };

        match self.execute(&call).await {
            Ok(response) => {
                tracing::debug!(
                    service = %self.service,
                    request_id = %request_id,
                    method = %call.method,
                    status = %response.status(),
                    "Service call completed"
                );
                Some(response)
            }
            Err(error) => {
                self.report(&error, &request_id);
                None
            }
        }
    }

    async fn execute(&self, call: &OutboundCall) -> Result<Response, ClientError> {
        match &self.breaker {
            Some(breaker) => breaker.call(|| self.send_with_retry(call)).await,
            None => self.send_with_retry(call).await,
        }
    }

    async fn send_with_retry(&self, call: &OutboundCall) -> Result<Response, ClientError> {
        match &self.retry {
            Some(policy) => with_retry(policy, &self.service, || self.send_once(call)).await,
            None => self.send_once(call).await,
        }
    }

    async fn send_once(&self, call: &OutboundCall) -> Result<Response, ClientError> {
        let mut builder = self
            .http
            .request(call.method.clone(), self.url.clone())
            .headers(call.options.headers.clone())
            .timeout(call.timeout);

        if !call.options.query.is_empty() {
            builder = builder.query(&call.options.query);
        }
        if let Some(body) = &call.body {
            builder = body.apply(builder);
        }

        let response = builder.send().await.map_err(ClientError::from_transport)?;

        if self.trip_on_server_error && response.status().is_server_error() {
            return Err(ClientError::ServerError(response.status()));
        }
        Ok(response)
    }

    fn report(&self, error: &ClientError, request_id: &str) {
        let kind = error.kind();

        match kind {
            FailureKind::ConnectionError => tracing::error!(
                service = %self.service,
                url = %self.url,
                request_id = %request_id,
                kind = %kind,
                error = %error,
                "Connection error connecting to service"
            ),
            FailureKind::Timeout => tracing::error!(
                service = %self.service,
                url = %self.url,
                request_id = %request_id,
                kind = %kind,
                error = %error,
                "Timeout connecting to service"
            ),
            FailureKind::BreakerOpen => tracing::error!(
                service = %self.service,
                url = %self.url,
                request_id = %request_id,
                kind = %kind,
                error = %error,
                "Circuit breaker rejected call"
            ),
            FailureKind::Error => tracing::error!(
                service = %self.service,
                url = %self.url,
                request_id = %request_id,
                kind = %kind,
                error = ?error,
                "Unexpected error calling service"
            ),
        }

        self.metrics.send(&kind.metric_name(&self.service));
    }
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("service", &self.service)
            .field("url", &self.url.as_str())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("circuit_breaker", &self.breaker.is_some())
            .finish()
    }
}

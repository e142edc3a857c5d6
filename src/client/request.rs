//! Caller-supplied request options.
//!
//! Headers, query and body pass through unmodified. The only additions are
//! the default timeout and a request ID header when the caller set none.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::RequestBuilder;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Correlation header sent with every attempt of a call.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-call options for a resilient verb.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    /// Deadline per attempt. `None` uses the client's default.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Return the request ID, generating and inserting one if absent.
    pub(crate) fn ensure_request_id(&mut self) -> String {
        if let Some(existing) = self.headers.get(REQUEST_ID_HEADER) {
            return existing.to_str().unwrap_or("invalid").to_string();
        }

        let id = Uuid::new_v4().to_string();
        if let Ok(value) = HeaderValue::from_str(&id) {
            self.headers.insert(REQUEST_ID_HEADER, value);
        }
        id
    }
}

/// Body of a POST.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
    Raw(Vec<u8>),
}

impl RequestBody {
    /// Serialize `value` into a JSON body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(RequestBody::Json(serde_json::to_value(value)?))
    }

    pub(crate) fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(pairs) => builder.form(pairs),
            RequestBody::Raw(bytes) => builder.body(bytes.clone()),
        }
    }
}

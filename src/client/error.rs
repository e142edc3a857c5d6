//! Failure classification for resilient calls.

use reqwest::StatusCode;
use std::error::Error as StdError;
use std::io;
use thiserror::Error;

use crate::resilience::circuit_breaker::CircuitOpenError;
use crate::resilience::retries::Retryable;

/// The four failure classes a resilient call reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ConnectionError,
    Timeout,
    BreakerOpen,
    Error,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ConnectionError => "connection_error",
            FailureKind::Timeout => "timeout",
            FailureKind::BreakerOpen => "breaker_open",
            FailureKind::Error => "error",
        }
    }

    /// Counter name emitted for this failure on `service`.
    pub fn metric_name(&self, service: &str) -> String {
        format!("circuitbreaker.{}.{}", service, self.as_str())
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a call produced no response.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection could not be established (refused, reset, DNS).
    #[error("connection error: {0}")]
    Connection(#[source] reqwest::Error),

    /// The attempt exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The breaker rejected the call without touching the network.
    #[error(transparent)]
    BreakerOpen(#[from] CircuitOpenError),

    /// 5xx response while server-error tripping is enabled.
    #[error("server responded with {0}")]
    ServerError(StatusCode),

    /// Any other transport or protocol failure.
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
}

impl ClientError {
    /// Sort a transport error into its failure class. Connect timeouts and
    /// connections the peer resets or closes mid-exchange count as
    /// connection errors.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_connect() {
            ClientError::Connection(error)
        } else if error.is_timeout() {
            ClientError::Timeout(error)
        } else if is_broken_connection(&error) {
            ClientError::Connection(error)
        } else {
            ClientError::Request(error)
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Connection(_) => FailureKind::ConnectionError,
            ClientError::Timeout(_) => FailureKind::Timeout,
            ClientError::BreakerOpen(_) => FailureKind::BreakerOpen,
            ClientError::ServerError(_) | ClientError::Request(_) => FailureKind::Error,
        }
    }
}

/// Whether anything in the error chain says the connection went away:
/// a reset, abort or broken pipe, or hyper giving up on an unfinished message.
fn is_broken_connection(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io_error) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_error.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        if let Some(hyper_error) = err.downcast_ref::<hyper::Error>() {
            if hyper_error.is_incomplete_message() {
                return true;
            }
        }
        current = err.source();
    }
    false
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        ClientError::from_transport(error)
    }
}

impl Retryable for ClientError {
    fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Connection(_) | ClientError::Timeout(_))
    }
}

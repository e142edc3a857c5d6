//! Resilient client subsystem.
//!
//! # Data Flow
//! ```text
//! caller → resilient.rs get/post/delete (request.rs options)
//!     → default timeout + request ID
//!     → circuit breaker (admit or reject)
//!     → retry loop → reqwest attempt
//!     → error.rs classification on failure
//!     → log + metric, Option<Response> back to caller
//! ```

pub mod error;
pub mod request;
pub mod resilient;

pub use error::{ClientError, FailureKind};
pub use request::{RequestBody, RequestOptions, REQUEST_ID_HEADER};
pub use resilient::ResilientClient;

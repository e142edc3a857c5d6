//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! ResilienceConfig.services
//!     → registry.rs (name → endpoint, validated once)
//!     → endpoint.rs (base URL + breaker thresholds)
//!     → breaker handle created on first use, shared by all clients
//! ```
//!
//! # Design Decisions
//! - Endpoints are immutable after startup
//! - Exactly one breaker per service name for the life of the registry

pub mod endpoint;
pub mod registry;

pub use endpoint::ServiceEndpoint;
pub use registry::{RegistryError, ServiceRegistry};

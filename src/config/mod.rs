//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ResilienceConfig (validated, immutable)
//!     → ServiceRegistry built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the registry is not reconfigurable
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BreakerDefaults, ClientConfig, LogFormat, ObservabilityConfig, ResilienceConfig, ServiceConfig,
};
pub use validation::{validate_config, ValidationError};

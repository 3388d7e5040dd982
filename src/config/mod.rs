//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed to the pipeline, session and monitor at startup
//! ```
//!
//! # Design Decisions
//! - Every section has defaults so an empty file (or no file) is valid
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ApiConfig, ClientConfig, LogFormat, ObservabilityConfig, RetryConfig, SessionConfig,
};
pub use validation::{validate_config, ValidationError};

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! flags / FORWARDEAZ_SERVICE_* env vars (clap)
//!     + optional config file (TOML)
//!     → loader.rs (parse, merge & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → ForwardAuthConfig handed to the checker at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields except the forward-auth address have defaults
//! - Validation separates syntactic (serde/clap) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{Args, ConfigError};
pub use schema::{LogFormat, ServiceConfig};
pub use validation::ValidationError;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → resolve.rs (routes section → RouterOptions)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the route directory is read once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod resolve;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use resolve::{resolve_router_options, DEFAULT_EXTENSION, DEFAULT_ROUTE_DIR};
pub use schema::{ListenerConfig, LogFormat, ObservabilityConfig, RoutesConfig, ServerConfig, TimeoutConfig};
pub use validation::{validate_config, ValidationError};

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → api::build_router compiles routes once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ApiKeyConfig, AuthConfig, DatabaseConfig, ErrorStatusConfig, GatewayConfig, ListenerConfig,
    ObservabilityConfig, RouteConfig, SecurityConfig, ShapeConfig, TimeoutConfig, TlsConfig,
};
pub use validation::{validate_config, ValidationError};

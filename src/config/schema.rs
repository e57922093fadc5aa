//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::projection::status::ER_SIGNAL_NOT_FOUND;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request limits and API keys.
    pub security: SecurityConfig,

    /// Backend settings.
    pub database: DatabaseConfig,

    /// Route definitions, in match order. Empty = built-in catalog.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds, backend query included.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,

    /// Static API keys accepted in the Authorization header.
    pub api_keys: Vec<ApiKeyConfig>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            api_keys: Vec::new(),
        }
    }
}

/// One API key and the user it authenticates as.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyConfig {
    pub token: String,
    pub user: String,
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// TOML file with in-memory procedure fixtures.
    pub fixtures: Option<String>,

    /// Backend error code → HTTP status. Unlisted codes become 500.
    pub error_status: Vec<ErrorStatusConfig>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            fixtures: None,
            error_status: vec![ErrorStatusConfig {
                code: ER_SIGNAL_NOT_FOUND,
                status: 404,
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorStatusConfig {
    pub code: u32,
    pub status: u16,
}

/// Route configuration binding a method/pattern to a stored procedure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Accepted methods, e.g. "GET" or "GET|HEAD" or "ANY".
    #[serde(default = "default_methods")]
    pub methods: String,

    /// Path regex, full-matched. Empty matches every path.
    #[serde(default)]
    pub pattern: String,

    /// Stored procedure to call.
    pub procedure: String,

    /// Argument names bound, in order, as procedure parameters. A `:u`
    /// or `:b` suffix binds the value as an unsigned integer or boolean.
    #[serde(default)]
    pub params: Vec<String>,

    /// Response document shape.
    #[serde(default)]
    pub shape: ShapeConfig,

    /// Field program text, required for the `fields` shape.
    #[serde(default)]
    pub fields: Option<String>,

    /// Who may call this route.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Argument naming the resource owner. Must equal the caller's name
    /// when `auth = "owner"`.
    #[serde(default)]
    pub owner_param: Option<String>,

    /// Argument set to "true"/"false" depending on whether the caller is
    /// the owner named by `owner_param`.
    #[serde(default)]
    pub owner_flag: Option<String>,

    /// Argument name under which the caller's name is injected.
    #[serde(default)]
    pub user_param: Option<String>,
}

fn default_methods() -> String {
    "GET".to_string()
}

/// Response shape as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeConfig {
    Ok,
    #[default]
    List,
    Value,
    Bool,
    U64,
    Fields,
    Redirect,
}

/// Authorization requirement as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthConfig {
    #[default]
    None,
    User,
    Owner,
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route definitions (unique names, known methods, field programs)
//! - Validate value ranges (timeouts > 0, status codes, addresses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Regex compilation is left to router construction, which fails startup

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::StatusCode;

use crate::api::procedure::ParamSpec;
use crate::config::schema::{AuthConfig, GatewayConfig, RouteConfig, ShapeConfig};
use crate::projection::fields::FieldProgram;
use crate::routing::method::MethodSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid {field} address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("security.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("duplicate API key for user {0:?}")]
    DuplicateApiKey(String),

    #[error("invalid HTTP status {status} for backend code {code}")]
    InvalidStatus { code: u32, status: u16 },

    #[error("duplicate route name {0:?}")]
    DuplicateRoute(String),

    #[error("route {route:?}: {message}")]
    Route { route: String, message: String },
}

impl ValidationError {
    fn route(route: &RouteConfig, message: impl Into<String>) -> Self {
        ValidationError::Route {
            route: route.name.clone(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let mut tokens = HashSet::new();
    for key in &config.security.api_keys {
        if !tokens.insert(key.token.as_str()) {
            errors.push(ValidationError::DuplicateApiKey(key.user.clone()));
        }
    }

    for entry in &config.database.error_status {
        if StatusCode::from_u16(entry.status).is_err() {
            errors.push(ValidationError::InvalidStatus {
                code: entry.code,
                status: entry.status,
            });
        }
    }

    let mut names = HashSet::new();
    for route in &config.routes {
        if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        validate_route(route, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(route: &RouteConfig, errors: &mut Vec<ValidationError>) {
    match route.methods.parse::<MethodSet>() {
        Ok(set) if set.is_empty() => {
            errors.push(ValidationError::route(route, "no methods accepted"))
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::route(route, e.to_string())),
    }

    if route.procedure.trim().is_empty() {
        errors.push(ValidationError::route(route, "procedure must not be empty"));
    }

    match (route.shape, &route.fields) {
        (ShapeConfig::Fields, None) => errors.push(ValidationError::route(
            route,
            "shape \"fields\" requires a field program",
        )),
        (ShapeConfig::Fields, Some(text)) => {
            if let Err(e) = FieldProgram::parse(text) {
                errors.push(ValidationError::route(route, e.to_string()));
            }
        }
        (_, Some(_)) => errors.push(ValidationError::route(
            route,
            "field program is only used by shape \"fields\"",
        )),
        (_, None) => {}
    }

    if route.auth == AuthConfig::Owner && route.owner_param.is_none() {
        errors.push(ValidationError::route(
            route,
            "auth \"owner\" requires owner_param",
        ));
    }
    if route.owner_flag.is_some() && route.owner_param.is_none() {
        errors.push(ValidationError::route(
            route,
            "owner_flag requires owner_param",
        ));
    }

    for param in &route.params {
        if let Err(e) = param.parse::<ParamSpec>() {
            errors.push(ValidationError::route(route, e.to_string()));
        }
    }
}

//! API layer: routes from configuration to procedure endpoints.
//!
//! # Data Flow
//! ```text
//! GatewayConfig.routes (or catalog::builtin_routes when empty)
//!     → build_route: MethodSet + PatternMatcher + ProcedureHandler
//!     → Router (registration order preserved)
//! ```
//!
//! # Design Decisions
//! - Every route is compiled at startup; any bad pattern aborts startup
//! - One status table shared by all handlers

pub mod catalog;
pub mod procedure;

use std::sync::Arc;

use axum::http::StatusCode;

use crate::config::schema::{AuthConfig, GatewayConfig, RouteConfig, ShapeConfig};
use crate::db::Database;
use crate::projection::fields::{FieldProgram, FieldProgramError};
use crate::projection::projector::ResponseShape;
use crate::projection::status::ErrorStatusMap;
use crate::routing::matcher::{PatternError, PatternMatcher};
use crate::routing::method::{MethodSet, UnknownMethod};
use crate::routing::router::Router;

pub use procedure::{AuthRequirement, ParamSpec, ParamSpecError, ProcedureHandler};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("route {route:?}: {source}")]
    Pattern {
        route: String,
        #[source]
        source: PatternError,
    },

    #[error("route {route:?}: {source}")]
    Method {
        route: String,
        #[source]
        source: UnknownMethod,
    },

    #[error("route {route:?}: {source}")]
    Fields {
        route: String,
        #[source]
        source: FieldProgramError,
    },

    #[error("route {route:?}: {source}")]
    Param {
        route: String,
        #[source]
        source: ParamSpecError,
    },

    #[error("route {0:?}: shape \"fields\" requires a field program")]
    MissingFields(String),

    #[error("route {0:?}: owner_param is required")]
    MissingOwnerParam(String),

    #[error("invalid HTTP status {status} for backend code {code}")]
    Status { code: u32, status: u16 },
}

/// Backend error code table from the `[database]` section.
pub fn status_map(config: &GatewayConfig) -> Result<ErrorStatusMap, BuildError> {
    let mut map = ErrorStatusMap::empty();
    for entry in &config.database.error_status {
        let status = StatusCode::from_u16(entry.status).map_err(|_| BuildError::Status {
            code: entry.code,
            status: entry.status,
        })?;
        map.insert(entry.code, status);
    }
    Ok(map)
}

/// Compile the configured routes, or the built-in catalog, into a router.
pub fn build_router(config: &GatewayConfig, db: Arc<dyn Database>) -> Result<Router, BuildError> {
    let status_map = Arc::new(status_map(config)?);
    let routes = if config.routes.is_empty() {
        tracing::info!("No routes configured, using built-in catalog");
        catalog::builtin_routes()
    } else {
        config.routes.clone()
    };

    let mut router = Router::new();
    for route in &routes {
        router.push(build_route(route, Arc::clone(&db), Arc::clone(&status_map))?);
    }

    tracing::info!(routes = router.len(), "Router built");
    Ok(router)
}

fn build_route(
    route: &RouteConfig,
    db: Arc<dyn Database>,
    status_map: Arc<ErrorStatusMap>,
) -> Result<PatternMatcher, BuildError> {
    let methods: MethodSet = route.methods.parse().map_err(|source| BuildError::Method {
        route: route.name.clone(),
        source,
    })?;

    let params = route
        .params
        .iter()
        .map(|p| p.parse::<ParamSpec>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| BuildError::Param {
            route: route.name.clone(),
            source,
        })?;

    let owner_param = || {
        route
            .owner_param
            .clone()
            .ok_or_else(|| BuildError::MissingOwnerParam(route.name.clone()))
    };
    let auth = match route.auth {
        AuthConfig::None => AuthRequirement::None,
        AuthConfig::User => AuthRequirement::User,
        AuthConfig::Owner => AuthRequirement::Owner(owner_param()?),
    };

    let mut handler = ProcedureHandler::new(&route.procedure, shape(route)?, db, status_map)
        .params(params)
        .auth(auth);
    if let Some(param) = &route.user_param {
        handler = handler.user_param(param);
    }
    if let Some(flag) = &route.owner_flag {
        handler = handler.owner_flag(flag, owner_param()?);
    }

    let matcher = PatternMatcher::new(methods, &route.pattern, Arc::new(handler))
        .map_err(|source| BuildError::Pattern {
            route: route.name.clone(),
            source,
        })?;
    Ok(matcher.named(route.name.as_str()))
}

fn shape(route: &RouteConfig) -> Result<ResponseShape, BuildError> {
    Ok(match route.shape {
        ShapeConfig::Ok => ResponseShape::Ok,
        ShapeConfig::List => ResponseShape::List,
        ShapeConfig::Value => ResponseShape::Value,
        ShapeConfig::Bool => ResponseShape::Boolean,
        ShapeConfig::U64 => ResponseShape::Integer,
        ShapeConfig::Redirect => ResponseShape::Redirect,
        ShapeConfig::Fields => {
            let text = route
                .fields
                .as_deref()
                .ok_or_else(|| BuildError::MissingFields(route.name.clone()))?;
            let program = FieldProgram::parse(text).map_err(|source| BuildError::Fields {
                route: route.name.clone(),
                source,
            })?;
            ResponseShape::Fields(program)
        }
    })
}

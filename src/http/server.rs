//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum application with a single fallback handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Turn each HTTP request into an `ApiRequest` and dispatch it to the router
//! - Serve on a plain TCP listener or over TLS, with graceful shutdown
//!
//! # Design Decisions
//! - All routing is done by the pattern router, not by Axum's path router
//! - The body is read fully before dispatch; its size is capped by
//!   `security.max_body_size`
//! - Metrics are recorded once per request, labelled with the matched route

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::{build_router, BuildError};
use crate::config::GatewayConfig;
use crate::db::Database;
use crate::http::request::ApiRequest;
use crate::http::response::ApiReply;
use crate::lifecycle::Shutdown;
use crate::net::tls::TlsError;
use crate::observability::metrics;
use crate::routing::Router as PatternRouter;
use crate::security::auth::Authenticator;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Time in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to build routes: {0}")]
    Build(#[from] BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),
}

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<PatternRouter>,
    pub auth: Arc<Authenticator>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    app: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Compile routes and build the application. Pattern errors are fatal here.
    pub fn new(config: GatewayConfig, db: Arc<dyn Database>) -> Result<Self, ServerError> {
        let state = AppState {
            router: Arc::new(build_router(&config, db)?),
            auth: Arc::new(Authenticator::new(&config.security.api_keys)),
        };
        let app = Self::build_app(&config, state);
        Ok(Self { app, config })
    }

    /// Build the Axum application with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The application, for serving or driving in-process.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server on `listener` until `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr` until `shutdown` is triggered.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown: Shutdown,
    ) -> Result<(), ServerError> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            shutdown.wait().await;
            drain.graceful_shutdown(Some(TLS_DRAIN));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.app.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

/// Build the `ApiRequest` for an HTTP request: authenticated user, then
/// query-string arguments, then JSON body members.
async fn api_request(state: &AppState, request: Request<Body>) -> Result<ApiRequest, ApiReply> {
    let (parts, body) = request.into_parts();

    let mut req = ApiRequest::new(parts.method, parts.uri.path())
        .with_user(state.auth.authenticate(&parts.headers));
    if let Some(query) = parts.uri.query() {
        req.args.extend_from_query(query);
    }

    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| ApiReply::error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"))?;
    if !bytes.is_empty() && is_json(&parts.headers) {
        req.args.extend_from_json(&bytes).map_err(|e| {
            ApiReply::error(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}"))
        })?;
    }
    Ok(req)
}

/// Fallback handler: every request goes through the pattern router.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (reply, route) = match api_request(&state, request).await {
        Ok(mut req) => {
            let reply = state.router.dispatch(&mut req).await;
            (reply, req.route().unwrap_or("none").to_string())
        }
        Err(reply) => (reply, "none".to_string()),
    };

    let status = reply.status();
    if status.is_server_error() {
        tracing::error!(
            request_id = %request_id,
            route = %route,
            status = status.as_u16(),
            "Request failed"
        );
    } else {
        tracing::debug!(
            request_id = %request_id,
            route = %route,
            status = status.as_u16(),
            "Request handled"
        );
    }
    metrics::record_request(&method, status.as_u16(), &route, start);

    reply.into_response()
}

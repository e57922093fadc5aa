//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, fallback dispatch)
//!     → request.rs (method, path, args from query/body, caller)
//!     → routing::Router (pattern match → procedure handler)
//!     → response.rs (ApiReply → status, content type, body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ApiRequest, Arg, Args};
pub use response::ApiReply;
pub use server::{AppState, HttpServer, ServerError};

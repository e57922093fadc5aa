//! Stored-procedure REST gateway library.
//!
//! Binds HTTP verbs and URL patterns to stored-procedure calls and streams
//! their result sets back as JSON documents.

// Core subsystems
pub mod api;
pub mod config;
pub mod db;
pub mod http;
pub mod net;
pub mod projection;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

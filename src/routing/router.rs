//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store pattern matchers in registration order
//! - Try each until one handles the request
//! - Fall through to the not-found handler
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan, first match wins; register specific patterns before general ones
//! - The not-found handler always replies, so routing always yields a response

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;

use super::handler::HttpHandler;
use super::matcher::PatternMatcher;
use crate::http::request::ApiRequest;
use crate::http::response::ApiReply;

/// Replies 404 for any request.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFound;

impl NotFound {
    fn reply(&self, req: &ApiRequest) -> ApiReply {
        ApiReply::error(
            StatusCode::NOT_FOUND,
            format!("Invalid API method {}", req.path()),
        )
    }
}

#[async_trait]
impl HttpHandler for NotFound {
    async fn handle(&self, req: &mut ApiRequest) -> Option<ApiReply> {
        Some(self.reply(req))
    }
}

/// Ordered matcher chain.
pub struct Router {
    routes: Vec<PatternMatcher>,
    not_found: Arc<dyn HttpHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            not_found: Arc::new(NotFound),
        }
    }

    pub fn route(mut self, matcher: PatternMatcher) -> Self {
        self.routes.push(matcher);
        self
    }

    pub fn push(&mut self, matcher: PatternMatcher) {
        self.routes.push(matcher);
    }

    pub fn with_not_found(mut self, handler: Arc<dyn HttpHandler>) -> Self {
        self.not_found = handler;
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> &[PatternMatcher] {
        &self.routes
    }

    /// Route a request to a reply. Never fails: misses end in the not-found handler.
    pub async fn dispatch(&self, req: &mut ApiRequest) -> ApiReply {
        for route in &self.routes {
            if let Some(reply) = route.handle(req).await {
                return reply;
            }
        }

        tracing::debug!(method = %req.method(), path = req.path(), "No route matched");
        match self.not_found.handle(req).await {
            Some(reply) => reply,
            None => NotFound.reply(req),
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpHandler for Router {
    async fn handle(&self, req: &mut ApiRequest) -> Option<ApiReply> {
        Some(self.dispatch(req).await)
    }
}

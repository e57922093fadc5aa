//! The handler contract shared by matchers, routers and endpoints.

use async_trait::async_trait;

use crate::http::request::ApiRequest;
use crate::http::response::ApiReply;

/// Something that may handle a request.
///
/// Returning `None` declines the request so the next route can be tried.
/// Handlers may add arguments to the request before replying.
#[async_trait]
pub trait HttpHandler: Send + Sync {
    async fn handle(&self, req: &mut ApiRequest) -> Option<ApiReply>;
}

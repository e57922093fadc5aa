//! Response values produced by handlers.
//!
//! # Responsibilities
//! - Carry status, content type and body from the handler chain to axum
//! - Keep success (JSON) and error (plain text) responses distinct
//!
//! # Design Decisions
//! - Bodies are complete before the reply is built; a failed projection
//!   never leaks a partial JSON document
//! - Error replies never carry `application/json`

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// A finished API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    status: StatusCode,
    content_type: Option<&'static str>,
    location: Option<String>,
    body: Vec<u8>,
}

impl ApiReply {
    /// `200 OK` with a JSON document.
    pub fn json(body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: Some(CONTENT_TYPE_JSON),
            location: None,
            body,
        }
    }

    /// Plain-text error.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some(CONTENT_TYPE_TEXT),
            location: None,
            body: message.into().into_bytes(),
        }
    }

    pub fn redirect(status: StatusCode, location: impl Into<String>) -> Self {
        Self {
            status,
            content_type: None,
            location: Some(location.into()),
            body: Vec::new(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::error(StatusCode::UNAUTHORIZED, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> Option<&'static str> {
        self.content_type
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_json(&self) -> bool {
        self.content_type == Some(CONTENT_TYPE_JSON)
    }
}

impl IntoResponse for ApiReply {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        if let Some(content_type) = self.content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        if let Some(location) = self.location {
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    headers.insert(header::LOCATION, value);
                }
                Err(_) => {
                    tracing::error!(location = %location, "Invalid redirect location");
                    return ApiReply::error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Invalid redirect location",
                    )
                    .into_response();
                }
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reply_is_plain_text() {
        let reply = ApiReply::error(StatusCode::NOT_FOUND, "Invalid API method /x");
        let response = reply.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], CONTENT_TYPE_TEXT);
    }

    #[test]
    fn test_redirect_sets_location() {
        let response =
            ApiReply::redirect(StatusCode::TEMPORARY_REDIRECT, "/files/a.png").into_response();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/files/a.png");
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_bad_location_becomes_error() {
        let response = ApiReply::redirect(StatusCode::FOUND, "bad\nvalue").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

//! Caller identification from static API keys.
//!
//! Accepts `Authorization: Token <key>` and `Authorization: Bearer <key>`.
//! Unknown or malformed credentials resolve to an anonymous caller; whether
//! that is acceptable is decided per route.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderMap};

use crate::config::ApiKeyConfig;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Resolves request credentials to users.
#[derive(Debug, Clone, Default)]
pub struct Authenticator {
    keys: HashMap<String, Arc<User>>,
}

impl Authenticator {
    pub fn new(keys: &[ApiKeyConfig]) -> Self {
        Self {
            keys: keys
                .iter()
                .map(|k| (k.token.clone(), Arc::new(User::new(k.user.clone()))))
                .collect(),
        }
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Option<Arc<User>> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value
            .strip_prefix("Token ")
            .or_else(|| value.strip_prefix("Bearer "))?
            .trim();

        let user = self.keys.get(token).cloned();
        if user.is_none() {
            tracing::debug!("Unknown API key presented");
        }
        user
    }
}

//! Request model seen by the routing layer.
//!
//! # Responsibilities
//! - Hold method, path and the ordered argument multimap
//! - Carry the authenticated user, if any
//! - Collect arguments from the query string and JSON object bodies
//!
//! # Design Decisions
//! - Arguments keep insertion order; positional path captures are unnamed
//! - Lookup by name returns the most recent value, so path captures
//!   (appended last) take precedence over query and body members

use std::sync::Arc;

use axum::http::Method;

use crate::security::auth::User;

/// One request argument. `name` is `None` for positional captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: String,
}

/// Ordered multimap of request arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    entries: Vec<Arg>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(Arg {
            name: Some(name.into()),
            value: value.into(),
        });
    }

    pub fn push_positional(&mut self, value: impl Into<String>) {
        self.entries.push(Arg {
            name: None,
            value: value.into(),
        });
    }

    /// Most recently inserted value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|arg| arg.name.as_deref() == Some(name))
            .map(|arg| arg.value.as_str())
    }

    /// Drop every value stored under `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|arg| arg.name.as_deref() != Some(name));
    }

    /// The `index`-th unnamed argument.
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.entries
            .iter()
            .filter(|arg| arg.name.is_none())
            .nth(index)
            .map(|arg| arg.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.entries.iter()
    }

    /// Append `key=value` pairs from a URL query string.
    pub fn extend_from_query(&mut self, query: &str) {
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            self.insert(name, value);
        }
    }

    /// Append the top-level members of a JSON object body. Strings are taken
    /// verbatim, nulls are skipped, other values keep their JSON text.
    pub fn extend_from_json(&mut self, body: &[u8]) -> Result<(), serde_json::Error> {
        let members: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)?;
        for (name, value) in members {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => self.insert(name, s),
                other => self.insert(name, other.to_string()),
            }
        }
        Ok(())
    }
}

/// A request travelling through the matcher chain.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    pub args: Args,
    user: Option<Arc<User>>,
    route: Option<Arc<str>>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            args: Args::new(),
            user: None,
            route: None,
        }
    }

    pub fn with_user(mut self, user: Option<Arc<User>>) -> Self {
        self.user = user;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_deref()
    }

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name)
    }

    /// Name of the route that handled the request, used as a metrics label.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn set_route(&mut self, route: Option<Arc<str>>) {
        self.route = route;
    }
}

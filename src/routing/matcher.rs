//! Route matching logic.
//!
//! # Responsibilities
//! - Test the request method against the route's method mask
//! - Full-match the path against a compiled regular expression
//! - Append capture groups to the request arguments and call the child
//!
//! # Design Decisions
//! - Method check first, no regex work for a wrong verb
//! - Empty pattern = always matches (wildcard), regex never evaluated
//! - Pattern is anchored on both ends, so `/profile/x` never matches
//!   `/profile/x/extra`
//! - Capture names are recorded once at construction, aligned with group
//!   declaration order
//! - Captures are rolled back if the child declines the request

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use super::handler::HttpHandler;
use super::method::MethodSet;
use crate::http::request::ApiRequest;
use crate::http::response::ApiReply;

#[derive(Debug, thiserror::Error)]
#[error("invalid route pattern {pattern:?}: {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// A (method mask, path pattern, child handler) binding.
pub struct PatternMatcher {
    name: Option<Arc<str>>,
    methods: MethodSet,
    pattern: String,
    regex: Option<Regex>,
    captures: Vec<Option<String>>,
    child: Arc<dyn HttpHandler>,
}

impl PatternMatcher {
    pub fn new(
        methods: MethodSet,
        pattern: &str,
        child: Arc<dyn HttpHandler>,
    ) -> Result<Self, PatternError> {
        let regex = if pattern.is_empty() {
            None
        } else {
            let anchored = format!(r"\A(?:{pattern})\z");
            Some(Regex::new(&anchored).map_err(|source| PatternError {
                pattern: pattern.to_string(),
                source,
            })?)
        };

        let captures = regex
            .as_ref()
            .map(|re| {
                re.capture_names()
                    .skip(1)
                    .map(|name| name.map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            name: None,
            methods,
            pattern: pattern.to_string(),
            regex,
            captures,
            child,
        })
    }

    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Position-aligned capture group names; `None` for unnamed groups.
    pub fn capture_names(&self) -> &[Option<String>] {
        &self.captures
    }

    /// Applies method and path tests and appends captures on success.
    /// Returns false without touching the request otherwise.
    fn capture(&self, req: &mut ApiRequest) -> bool {
        if !self.methods.contains(req.method()) {
            return false;
        }
        let Some(regex) = &self.regex else {
            return true;
        };
        let Some(caps) = regex.captures(req.path()) else {
            return false;
        };

        // A group that did not participate captures "", same as an empty match.
        let values: Vec<String> = (1..caps.len())
            .map(|i| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect();
        for (name, value) in self.captures.iter().zip(values) {
            match name {
                Some(name) => req.args.insert(name.clone(), value),
                None => req.args.push_positional(value),
            }
        }
        true
    }
}

#[async_trait]
impl HttpHandler for PatternMatcher {
    async fn handle(&self, req: &mut ApiRequest) -> Option<ApiReply> {
        let mark = req.args.len();
        if !self.capture(req) {
            return None;
        }

        tracing::debug!(
            route = self.name().unwrap_or(""),
            pattern = %self.pattern,
            path = req.path(),
            "Route matched"
        );
        req.set_route(self.name.clone());

        let reply = self.child.handle(req).await;
        if reply.is_none() {
            req.args.truncate(mark);
            req.set_route(None);
        }
        reply
    }
}

impl fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("pattern", &self.pattern)
            .field("captures", &self.captures)
            .finish()
    }
}

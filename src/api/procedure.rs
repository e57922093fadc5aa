//! Stored-procedure endpoint.
//!
//! # Responsibilities
//! - Enforce the route's authorization requirement
//! - Inject caller-derived arguments (user name, ownership flag)
//! - Bind request arguments to procedure parameters
//! - Run the query through a fresh projector and return its reply
//!
//! # Data Flow
//! ```text
//! ApiRequest (args from query/body/path)
//!     → authorize (401 on failure, no query issued)
//!     → inject user_param / owner_flag
//!     → ProcedureCall (params in declared order, absent → NULL)
//!     → Database::query → Projector::run → ApiReply
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::db::{Database, ProcedureCall, SqlValue};
use crate::http::request::ApiRequest;
use crate::http::response::ApiReply;
use crate::projection::projector::{Projector, ResponseShape};
use crate::projection::status::ErrorStatusMap;
use crate::routing::handler::HttpHandler;

pub const LOGIN_REQUIRED: &str = "Not authorized, please login";
pub const NOT_OWNER: &str = "Not authorized";

/// Who may call a route.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthRequirement {
    #[default]
    None,
    /// Any authenticated caller.
    User,
    /// An authenticated caller whose name equals the named argument.
    Owner(String),
}

/// How a request argument is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    UInt,
    Bool,
}

/// A procedure parameter: argument name plus binding kind.
///
/// Written as `name`, `name:s`, `name:u` or `name:b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamSpecError {
    #[error("empty parameter name in {0:?}")]
    EmptyName(String),

    #[error("unknown parameter kind {kind:?} in {spec:?}")]
    UnknownKind { spec: String, kind: String },
}

impl FromStr for ParamSpec {
    type Err = ParamSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, kind) = match s.split_once(':') {
            Some((name, kind)) => (name, kind),
            None => (s, "s"),
        };
        if name.is_empty() {
            return Err(ParamSpecError::EmptyName(s.to_string()));
        }
        let kind = match kind {
            "s" => ParamKind::Text,
            "u" => ParamKind::UInt,
            "b" => ParamKind::Bool,
            other => {
                return Err(ParamSpecError::UnknownKind {
                    spec: s.to_string(),
                    kind: other.to_string(),
                })
            }
        };
        Ok(Self {
            name: name.to_string(),
            kind,
        })
    }
}

impl fmt::Display for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParamKind::Text => write!(f, "{}", self.name),
            ParamKind::UInt => write!(f, "{}:u", self.name),
            ParamKind::Bool => write!(f, "{}:b", self.name),
        }
    }
}

impl ParamSpec {
    /// Convert an argument value. `None` means the value does not fit the kind.
    fn convert(&self, value: &str) -> Option<SqlValue> {
        match self.kind {
            ParamKind::Text => Some(SqlValue::Text(value.to_string())),
            ParamKind::UInt => value.trim().parse().ok().map(SqlValue::UInt),
            ParamKind::Bool => match value.trim() {
                "1" | "true" => Some(SqlValue::Bool(true)),
                "0" | "false" | "" => Some(SqlValue::Bool(false)),
                _ => None,
            },
        }
    }
}

/// Calls one stored procedure and projects its results.
pub struct ProcedureHandler {
    procedure: String,
    params: Vec<ParamSpec>,
    shape: ResponseShape,
    auth: AuthRequirement,
    user_param: Option<String>,
    owner_flag: Option<(String, String)>,
    db: Arc<dyn Database>,
    status_map: Arc<ErrorStatusMap>,
}

impl ProcedureHandler {
    pub fn new(
        procedure: impl Into<String>,
        shape: ResponseShape,
        db: Arc<dyn Database>,
        status_map: Arc<ErrorStatusMap>,
    ) -> Self {
        Self {
            procedure: procedure.into(),
            params: Vec::new(),
            shape,
            auth: AuthRequirement::None,
            user_param: None,
            owner_flag: None,
            db,
            status_map,
        }
    }

    pub fn params(mut self, params: Vec<ParamSpec>) -> Self {
        self.params = params;
        self
    }

    pub fn auth(mut self, auth: AuthRequirement) -> Self {
        self.auth = auth;
        self
    }

    /// Insert the caller's name under `name` when a caller is known.
    pub fn user_param(mut self, name: impl Into<String>) -> Self {
        self.user_param = Some(name.into());
        self
    }

    /// Insert whether the caller owns the resource named by `owner_param`.
    pub fn owner_flag(mut self, flag: impl Into<String>, owner_param: impl Into<String>) -> Self {
        self.owner_flag = Some((flag.into(), owner_param.into()));
        self
    }

    fn authorize(&self, req: &ApiRequest) -> Result<(), ApiReply> {
        let user = match (&self.auth, req.user()) {
            (AuthRequirement::None, _) => return Ok(()),
            (_, None) => return Err(ApiReply::unauthorized(LOGIN_REQUIRED)),
            (_, Some(user)) => user,
        };

        if let AuthRequirement::Owner(param) = &self.auth {
            if req.arg(param) != Some(user.name.as_str()) {
                tracing::debug!(user = %user.name, param = %param, "Caller is not the owner");
                return Err(ApiReply::unauthorized(NOT_OWNER));
            }
        }
        Ok(())
    }

    fn inject(&self, req: &mut ApiRequest) {
        let caller = req.user().map(|u| u.name.clone());

        if let Some((flag, owner_param)) = &self.owner_flag {
            let owns = caller.is_some() && req.arg(owner_param) == caller.as_deref();
            req.args.insert(flag.clone(), owns.to_string());
        }
        // The injected identity always shadows request-supplied values.
        if let Some(param) = &self.user_param {
            match caller {
                Some(caller) => req.args.insert(param.clone(), caller),
                None => req.args.remove(param),
            }
        }
    }

    fn bind(&self, req: &ApiRequest) -> Result<ProcedureCall, ApiReply> {
        let mut call = ProcedureCall::new(self.procedure.clone());
        for spec in &self.params {
            let value = match req.arg(&spec.name) {
                None => SqlValue::Null,
                Some(raw) => spec.convert(raw).ok_or_else(|| {
                    ApiReply::error(
                        StatusCode::BAD_REQUEST,
                        format!("Invalid value for parameter {}", spec.name),
                    )
                })?,
            };
            call = call.bind(spec.name.clone(), value);
        }
        Ok(call)
    }
}

#[async_trait]
impl HttpHandler for ProcedureHandler {
    async fn handle(&self, req: &mut ApiRequest) -> Option<ApiReply> {
        if let Err(reply) = self.authorize(req) {
            return Some(reply);
        }
        self.inject(req);

        let call = match self.bind(req) {
            Ok(call) => call,
            Err(reply) => return Some(reply),
        };

        let projector = Projector::new(self.shape.clone(), Arc::clone(&self.status_map));
        Some(projector.run(self.db.query(call)).await)
    }
}

impl fmt::Debug for ProcedureHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureHandler")
            .field("procedure", &self.procedure)
            .field("params", &self.params)
            .field("shape", &self.shape.name())
            .field("auth", &self.auth)
            .finish()
    }
}

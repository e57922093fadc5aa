//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use sproc_gateway::config::{parse_config, GatewayConfig};
use sproc_gateway::db::{Database, EventStream, MemoryDatabase, ProcedureCall};
use sproc_gateway::HttpServer;

pub const ALICE_KEY: &str = "alice-key";
pub const BOB_KEY: &str = "bob-key";

/// Gateway configuration used by the integration tests. No routes, so the
/// built-in catalog is served.
pub const CONFIG: &str = r#"
[listener]
bind_address = "127.0.0.1:0"

[observability]
metrics_enabled = false

[security]
max_body_size = 1024

[[security.api_keys]]
token = "alice-key"
user = "alice"

[[security.api_keys]]
token = "bob-key"
user = "bob"
"#;

/// Canned procedure results for the built-in catalog.
pub const FIXTURES: &str = r#"
[[procedures]]
name = "GetLicenses"
[[procedures.results]]
columns = ["name"]
rows = [["MIT"], ["GPL-3.0"]]

[[procedures]]
name = "FindThings"
[[procedures.results]]
columns = ["owner", "name", "stars"]
rows = [["alice", "arm", 3], ["bob", "leg", 0]]

[[procedures]]
name = "Available"
[[procedures.results]]
columns = ["available"]
rows = [[1]]

[[procedures]]
name = "GetProfileAvatar"
[[procedures.results]]
columns = ["url"]
rows = [["https://cdn.example.com/avatars/alice.png"]]

[[procedures]]
name = "GetProfile"
[[procedures.results]]
columns = ["name", "fullname"]
rows = [["alice", "Alice Example"]]
[[procedures.results]]
columns = ["name", "title"]
rows = [["arm", "Robot arm"], ["leg", "Robot leg"]]
[[procedures.results]]
columns = ["name"]
rows = [["bob"]]
[[procedures.results]]
columns = ["name"]
[[procedures.results]]
columns = ["owner", "name"]
[[procedures.results]]
columns = ["name"]
[[procedures.results]]
columns = ["action", "object"]

[[procedures]]
name = "PutProfile"

[[procedures]]
name = "Follow"

[[procedures]]
name = "PostComment"
[[procedures.results]]
columns = ["id"]
rows = [[17]]

[[procedures]]
name = "GetThing"
error = { code = 1643, message = "Thing not found" }

[[procedures]]
name = "DeleteThing"
error = { code = 1451, message = "Cannot delete a parent row" }
"#;

/// Backend that records every call before answering from fixtures.
pub struct RecordingDatabase {
    inner: MemoryDatabase,
    calls: Mutex<Vec<ProcedureCall>>,
}

impl RecordingDatabase {
    pub fn new(inner: MemoryDatabase) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ProcedureCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> ProcedureCall {
        self.calls().pop().expect("no procedure was called")
    }
}

impl Database for RecordingDatabase {
    fn query(&self, call: ProcedureCall) -> EventStream {
        self.calls.lock().unwrap().push(call.clone());
        self.inner.query(call)
    }
}

pub fn test_config() -> GatewayConfig {
    parse_config(CONFIG).unwrap()
}

pub fn test_server() -> (HttpServer, Arc<RecordingDatabase>) {
    let db = Arc::new(RecordingDatabase::new(
        MemoryDatabase::from_toml(FIXTURES).unwrap(),
    ));
    let server = HttpServer::new(test_config(), db.clone()).unwrap();
    (server, db)
}

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn authed(method: Method, uri: &str, key: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Token {key}"))
        .body(Body::empty())
        .unwrap()
}

pub fn json_body(method: Method, uri: &str, key: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Token {key}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Drive the app in-process and collect the response.
pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

pub fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
}

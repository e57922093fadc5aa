//! Result projector: database events in, JSON reply out.
//!
//! # State Machine
//! ```text
//! Idle ──begin-result──▶ InResult ──row*──▶ InResult ──end-result──▶ Idle
//! Idle ──done──▶ Closed
//! any  ──error / protocol violation──▶ Failed
//! ```
//!
//! # Design Decisions
//! - The field program is consulted only at result-set boundaries
//! - Rows are written as they arrive; a merged field holds at most one row
//!   until its result set ends
//! - On failure the partial document is dropped and a plain-text reply is
//!   produced instead, so success and error bodies never mix
//! - Every response shape runs through the same engine

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::{Stream, StreamExt};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::db::{Column, DbError, DbEvent, Row, RowError, SqlValue};
use crate::http::response::ApiReply;
use crate::observability::metrics;
use crate::projection::fields::{FieldDescriptor, FieldKind, FieldProgram};
use crate::projection::status::ErrorStatusMap;
use crate::projection::writer::{DocumentWriter, WriterError};

/// Status used by redirect-shaped handlers.
pub const REDIRECT_STATUS: StatusCode = StatusCode::TEMPORARY_REDIRECT;

/// The kind of document a handler produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// No result sets; replies `"ok"`.
    Ok,
    /// One result set as a JSON array.
    List,
    /// One result set folded into a single value (`null` when empty).
    Value,
    /// First column of a single row as a JSON boolean.
    Boolean,
    /// First column of a single row as an unsigned 64-bit integer.
    Integer,
    /// First column of a single row used as the redirect location.
    Redirect,
    /// A top-level dict with one member per result set.
    Fields(FieldProgram),
}

impl ResponseShape {
    pub fn name(&self) -> &'static str {
        match self {
            ResponseShape::Ok => "ok",
            ResponseShape::List => "list",
            ResponseShape::Value => "value",
            ResponseShape::Boolean => "bool",
            ResponseShape::Integer => "u64",
            ResponseShape::Redirect => "redirect",
            ResponseShape::Fields(_) => "fields",
        }
    }

    /// Number of result sets a query must produce for this shape.
    pub fn expected_result_sets(&self) -> usize {
        match self {
            ResponseShape::Ok => 0,
            ResponseShape::Fields(program) => program.len(),
            _ => 1,
        }
    }
}

/// Public view of the projector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionState {
    Idle,
    InResult,
    Closed,
    Failed,
}

impl fmt::Display for ProjectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectionState::Idle => "idle",
            ProjectionState::InResult => "in result",
            ProjectionState::Closed => "closed",
            ProjectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("Unexpected result set")]
    UnexpectedResultSet,

    #[error("Missing {0} expected result set(s)")]
    MissingResultSets(usize),

    #[error("Unexpected DB event {event} while {state}")]
    UnexpectedEvent {
        event: &'static str,
        state: ProjectionState,
    },

    #[error("Row has {actual} columns but result set declares {expected}")]
    RowWidth { expected: usize, actual: usize },

    #[error("Row error: {0}")]
    Row(#[from] RowError),

    #[error("Document error: {0}")]
    Writer(#[from] WriterError),

    #[error("No redirect location in result")]
    MissingRedirect,

    #[error("No row for {0} result")]
    MissingValue(&'static str),

    #[error("Database connection lost")]
    ConnectionLost,
}

impl ProjectionError {
    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            ProjectionError::UnexpectedResultSet | ProjectionError::MissingResultSets(_) => {
                "result_set_count"
            }
            ProjectionError::UnexpectedEvent { .. } => "event_order",
            ProjectionError::RowWidth { .. }
            | ProjectionError::Row(_)
            | ProjectionError::MissingValue(_) => "row",
            ProjectionError::Writer(_) => "document",
            ProjectionError::MissingRedirect => "redirect",
            ProjectionError::ConnectionLost => "connection",
        }
    }
}

/// Outcome of feeding one event.
#[derive(Debug)]
pub enum Step {
    Continue,
    Finished(ApiReply),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coercion {
    Natural,
    Boolean,
    Integer,
    Location,
}

/// A row reduced to what will be written.
#[derive(Debug)]
enum Projected {
    Scalar(SqlValue),
    Row(Row),
}

/// Serializes a row as `{column: value, ...}` without copying it.
struct RowView<'a> {
    columns: &'a [Column],
    row: &'a Row,
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.row.values()) {
            map.serialize_entry(&column.name, value)?;
        }
        map.end()
    }
}

#[derive(Debug)]
struct ActiveResult {
    /// Key in the top-level dict; `None` for bare shapes.
    name: Option<String>,
    kind: FieldKind,
    columns: Vec<Column>,
    pending: Option<Projected>,
}

#[derive(Debug)]
enum Phase {
    Idle,
    InResult(ActiveResult),
    Closed,
    Failed,
}

/// Per-request projection engine.
#[derive(Debug)]
pub struct Projector {
    shape: &'static str,
    program: FieldProgram,
    keyed: bool,
    coercion: Coercion,
    ok_reply: bool,
    status_map: Arc<ErrorStatusMap>,
    writer: DocumentWriter,
    opened: bool,
    location: Option<String>,
    phase: Phase,
}

impl Projector {
    pub fn new(shape: ResponseShape, status_map: Arc<ErrorStatusMap>) -> Self {
        let name = shape.name();
        let ok_reply = matches!(shape, ResponseShape::Ok);
        let (program, keyed, coercion) = match shape {
            ResponseShape::Ok => (FieldProgram::empty(), false, Coercion::Natural),
            ResponseShape::List => (bare(FieldKind::List), false, Coercion::Natural),
            ResponseShape::Value => (bare(FieldKind::Merged), false, Coercion::Natural),
            ResponseShape::Boolean => (bare(FieldKind::Merged), false, Coercion::Boolean),
            ResponseShape::Integer => (bare(FieldKind::Merged), false, Coercion::Integer),
            ResponseShape::Redirect => (bare(FieldKind::Merged), false, Coercion::Location),
            ResponseShape::Fields(program) => (program, true, Coercion::Natural),
        };

        Self {
            shape: name,
            program,
            keyed,
            coercion,
            ok_reply,
            status_map,
            writer: DocumentWriter::new(),
            opened: false,
            location: None,
            phase: Phase::Idle,
        }
    }

    pub fn state(&self) -> ProjectionState {
        match self.phase {
            Phase::Idle => ProjectionState::Idle,
            Phase::InResult(_) => ProjectionState::InResult,
            Phase::Closed => ProjectionState::Closed,
            Phase::Failed => ProjectionState::Failed,
        }
    }

    /// Document bytes written so far.
    pub fn partial_output(&self) -> &[u8] {
        self.writer.as_bytes()
    }

    /// Drive the projector over a whole event stream.
    ///
    /// The stream is dropped, releasing its connection, as soon as a reply is
    /// decided. A stream that ends without `Done` or `Error` is a lost connection.
    pub async fn run<S>(mut self, mut events: S) -> ApiReply
    where
        S: Stream<Item = DbEvent> + Unpin,
    {
        while let Some(event) = events.next().await {
            if let Step::Finished(reply) = self.handle(event) {
                return reply;
            }
        }
        self.fail(ProjectionError::ConnectionLost)
    }

    /// Feed a single event.
    pub fn handle(&mut self, event: DbEvent) -> Step {
        let kind = event.kind();
        if matches!(self.phase, Phase::Closed | Phase::Failed) {
            let err = self.unexpected(kind);
            return Step::Finished(self.fail(err));
        }

        let result = match event {
            DbEvent::BeginResult(columns) => self.begin_result(columns).map(|_| Step::Continue),
            DbEvent::Row(row) => self.row(row).map(|_| Step::Continue),
            DbEvent::EndResult => self.end_result().map(|_| Step::Continue),
            DbEvent::Done => self.done().map(Step::Finished),
            DbEvent::Error(err) => Ok(Step::Finished(self.backend_error(err))),
        };

        result.unwrap_or_else(|err| Step::Finished(self.fail(err)))
    }

    fn begin_result(&mut self, columns: Vec<Column>) -> Result<(), ProjectionError> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(self.unexpected("begin-result"));
        }
        self.open_document()?;

        let FieldDescriptor { name, kind } = self
            .program
            .next()
            .cloned()
            .ok_or(ProjectionError::UnexpectedResultSet)?;

        tracing::trace!(shape = self.shape, field = %name, columns = columns.len(), "Result set started");

        let name = self.keyed.then_some(name);
        if kind == FieldKind::List {
            if let Some(name) = &name {
                self.writer.key(name)?;
            }
            self.writer.begin_list()?;
        }

        self.phase = Phase::InResult(ActiveResult {
            name,
            kind,
            columns,
            pending: None,
        });
        Ok(())
    }

    fn row(&mut self, row: Row) -> Result<(), ProjectionError> {
        let state = self.state();
        let Phase::InResult(active) = &mut self.phase else {
            return Err(ProjectionError::UnexpectedEvent { event: "row", state });
        };

        if row.column_count() != active.columns.len() {
            return Err(ProjectionError::RowWidth {
                expected: active.columns.len(),
                actual: row.column_count(),
            });
        }

        let projected = match self.coercion {
            Coercion::Natural if active.columns.len() == 1 => Projected::Scalar(row.get(0)?.clone()),
            Coercion::Natural => Projected::Row(row),
            Coercion::Boolean => Projected::Scalar(SqlValue::Bool(row.get_bool(0)?)),
            Coercion::Integer => Projected::Scalar(SqlValue::UInt(row.get_u64(0)?)),
            Coercion::Location => {
                self.location = Some(row.get_str(0)?.to_string());
                return Ok(());
            }
        };

        match active.kind {
            FieldKind::List => write_projected(&mut self.writer, &active.columns, &projected)?,
            FieldKind::Merged => {
                if active.pending.is_some() {
                    tracing::warn!(
                        shape = self.shape,
                        field = active.name.as_deref().unwrap_or(""),
                        "Extra row under merged field replaces the previous row"
                    );
                }
                active.pending = Some(projected);
            }
        }
        Ok(())
    }

    fn end_result(&mut self) -> Result<(), ProjectionError> {
        if !matches!(self.phase, Phase::InResult(_)) {
            return Err(self.unexpected("end-result"));
        }
        let Phase::InResult(active) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return Err(self.unexpected("end-result"));
        };

        match active.kind {
            FieldKind::List => self.writer.end_list()?,
            FieldKind::Merged if self.coercion == Coercion::Location => {}
            FieldKind::Merged => {
                if let Some(name) = &active.name {
                    self.writer.key(name)?;
                }
                match &active.pending {
                    Some(projected) => {
                        write_projected(&mut self.writer, &active.columns, projected)?
                    }
                    None if matches!(self.coercion, Coercion::Boolean | Coercion::Integer) => {
                        return Err(ProjectionError::MissingValue(self.shape));
                    }
                    None => self.writer.null()?,
                }
            }
        }
        Ok(())
    }

    fn done(&mut self) -> Result<ApiReply, ProjectionError> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(self.unexpected("done"));
        }
        if self.program.remaining() > 0 {
            return Err(ProjectionError::MissingResultSets(self.program.remaining()));
        }

        let reply = if self.coercion == Coercion::Location {
            let location = self
                .location
                .take()
                .ok_or(ProjectionError::MissingRedirect)?;
            ApiReply::redirect(REDIRECT_STATUS, location)
        } else {
            self.open_document()?;
            if self.ok_reply {
                self.writer.value("ok")?;
            }
            if self.keyed {
                self.writer.end_dict()?;
            }
            ApiReply::json(std::mem::take(&mut self.writer).finish()?)
        };

        self.phase = Phase::Closed;
        Ok(reply)
    }

    /// Open the top-level container once per document.
    fn open_document(&mut self) -> Result<(), ProjectionError> {
        if !self.opened {
            if self.keyed {
                self.writer.begin_dict()?;
            }
            self.opened = true;
        }
        Ok(())
    }

    fn unexpected(&self, event: &'static str) -> ProjectionError {
        ProjectionError::UnexpectedEvent {
            event,
            state: self.state(),
        }
    }

    fn discard(&mut self) {
        self.writer = DocumentWriter::new();
        self.location = None;
        self.phase = Phase::Failed;
    }

    fn fail(&mut self, err: ProjectionError) -> ApiReply {
        self.discard();
        tracing::error!(shape = self.shape, error = %err, "Projection failed");
        metrics::record_projection_failure(err.kind());
        ApiReply::error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }

    fn backend_error(&mut self, err: DbError) -> ApiReply {
        self.discard();
        let status = self.status_map.status_for(err.code);
        tracing::error!(code = err.code, status = %status, message = %err.message, "Database error");
        ApiReply::error(status, err.to_string())
    }
}

fn bare(kind: FieldKind) -> FieldProgram {
    FieldProgram::new(vec![FieldDescriptor {
        name: String::new(),
        kind,
    }])
}

fn write_projected(
    writer: &mut DocumentWriter,
    columns: &[Column],
    projected: &Projected,
) -> Result<(), WriterError> {
    match projected {
        Projected::Scalar(value) => writer.value(value),
        Projected::Row(row) => writer.value(&RowView { columns, row }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::{CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT};
    use crate::projection::status::ER_SIGNAL_NOT_FOUND;
    use futures_util::stream;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};
    use std::time::Duration;

    fn begin(columns: &[&str]) -> DbEvent {
        DbEvent::BeginResult(columns.iter().map(|c| Column::new(*c)).collect())
    }

    fn row(values: Vec<SqlValue>) -> DbEvent {
        DbEvent::Row(Row::new(values))
    }

    fn projector(shape: ResponseShape) -> Projector {
        Projector::new(shape, Arc::new(ErrorStatusMap::default()))
    }

    fn fields(text: &str) -> ResponseShape {
        ResponseShape::Fields(FieldProgram::parse(text).unwrap())
    }

    async fn project(shape: ResponseShape, events: Vec<DbEvent>) -> ApiReply {
        projector(shape).run(stream::iter(events)).await
    }

    fn body(reply: &ApiReply) -> &str {
        std::str::from_utf8(reply.body()).unwrap()
    }

    /// Stream wrapper recording when it is dropped.
    struct Tracked<S> {
        inner: S,
        released: Arc<AtomicBool>,
    }

    impl<S> Drop for Tracked<S> {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    impl<S: Stream<Item = DbEvent> + Unpin> Stream for Tracked<S> {
        type Item = DbEvent;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<DbEvent>> {
            Pin::new(&mut self.inner).poll_next(cx)
        }
    }

    #[tokio::test]
    async fn test_single_column_list() {
        let reply = project(
            ResponseShape::List,
            vec![
                begin(&["name"]),
                row(vec!["MIT".into()]),
                row(vec!["GPL".into()]),
                row(vec!["BSD".into()]),
                DbEvent::EndResult,
                DbEvent::Done,
            ],
        )
        .await;

        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(reply.content_type(), Some(CONTENT_TYPE_JSON));
        assert_eq!(body(&reply), r#"["MIT","GPL","BSD"]"#);
    }

    #[tokio::test]
    async fn test_multi_column_list() {
        let reply = project(
            ResponseShape::List,
            vec![
                begin(&["tag", "count"]),
                row(vec!["robots".into(), SqlValue::Int(12)]),
                DbEvent::EndResult,
                DbEvent::Done,
            ],
        )
        .await;

        assert_eq!(body(&reply), r#"[{"tag":"robots","count":12}]"#);
    }

    #[tokio::test]
    async fn test_empty_list() {
        let reply = project(
            ResponseShape::List,
            vec![begin(&["name"]), DbEvent::EndResult, DbEvent::Done],
        )
        .await;
        assert_eq!(body(&reply), "[]");
    }

    #[tokio::test]
    async fn test_merged_then_list_fields() {
        let reply = project(
            fields("*profile things"),
            vec![
                begin(&["name"]),
                row(vec!["alice".into()]),
                DbEvent::EndResult,
                begin(&["name", "stars"]),
                row(vec!["robot".into(), SqlValue::UInt(3)]),
                row(vec!["laser".into(), SqlValue::UInt(0)]),
                DbEvent::EndResult,
                DbEvent::Done,
            ],
        )
        .await;

        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(
            body(&reply),
            r#"{"profile":"alice","things":[{"name":"robot","stars":3},{"name":"laser","stars":0}]}"#
        );
    }

    #[tokio::test]
    async fn test_merged_multi_column_row() {
        let reply = project(
            fields("*thing files"),
            vec![
                begin(&["name", "title"]),
                row(vec!["robot".into(), "My Robot".into()]),
                DbEvent::EndResult,
                begin(&["file"]),
                DbEvent::EndResult,
                DbEvent::Done,
            ],
        )
        .await;

        assert_eq!(
            body(&reply),
            r#"{"thing":{"name":"robot","title":"My Robot"},"files":[]}"#
        );
    }

    #[tokio::test]
    async fn test_merged_without_rows_is_null() {
        let reply = project(
            fields("*profile"),
            vec![begin(&["name", "bio"]), DbEvent::EndResult, DbEvent::Done],
        )
        .await;
        assert_eq!(body(&reply), r#"{"profile":null}"#);
    }

    #[tokio::test]
    async fn test_merged_last_row_wins() {
        let reply = project(
            ResponseShape::Value,
            vec![
                begin(&["name", "n"]),
                row(vec!["first".into(), SqlValue::Int(1)]),
                row(vec!["second".into(), SqlValue::Int(2)]),
                DbEvent::EndResult,
                DbEvent::Done,
            ],
        )
        .await;
        assert_eq!(body(&reply), r#"{"name":"second","n":2}"#);
    }

    #[test]
    fn test_extra_result_set_fails_on_third_begin() {
        let mut p = projector(fields("*profile things"));
        let events = vec![
            begin(&["name"]),
            row(vec!["alice".into()]),
            DbEvent::EndResult,
            begin(&["thing"]),
            row(vec!["robot".into()]),
            DbEvent::EndResult,
        ];
        for event in events {
            assert!(matches!(p.handle(event), Step::Continue));
        }
        assert_eq!(p.state(), ProjectionState::Idle);
        assert!(!p.partial_output().ends_with(b"}"));

        let Step::Finished(reply) = p.handle(begin(&["follower"])) else {
            panic!("third result set must terminate the projection");
        };
        assert_eq!(p.state(), ProjectionState::Failed);
        assert!(p.partial_output().is_empty());
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply.content_type(), Some(CONTENT_TYPE_TEXT));
        assert_eq!(body(&reply), "Unexpected result set");
    }

    #[tokio::test]
    async fn test_missing_result_set_fails() {
        let reply = project(
            fields("*profile things"),
            vec![
                begin(&["name"]),
                row(vec!["alice".into()]),
                DbEvent::EndResult,
                DbEvent::Done,
            ],
        )
        .await;
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!reply.is_json());
    }

    #[tokio::test]
    async fn test_replay_is_byte_identical() {
        let events = vec![
            begin(&["name"]),
            row(vec!["alice".into()]),
            DbEvent::EndResult,
            begin(&["a", "b"]),
            row(vec![SqlValue::Float(1.5), SqlValue::Null]),
            DbEvent::EndResult,
            DbEvent::Done,
        ];
        let first = project(fields("*profile things"), events.clone()).await;
        let second = project(fields("*profile things"), events).await;
        assert_eq!(first.body(), second.body());
    }

    #[tokio::test]
    async fn test_backend_error_mapping() {
        let not_found = project(
            ResponseShape::List,
            vec![
                begin(&["name"]),
                row(vec!["partial".into()]),
                DbEvent::Error(DbError::new(ER_SIGNAL_NOT_FOUND, "Profile not found")),
            ],
        )
        .await;
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.content_type(), Some(CONTENT_TYPE_TEXT));
        assert_eq!(body(&not_found), "DB:1643: Profile not found");

        let other = project(
            ResponseShape::Ok,
            vec![DbEvent::Error(DbError::new(1062, "Duplicate entry"))],
        )
        .await;
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!other.is_json());
    }

    #[tokio::test]
    async fn test_scalar_shapes() {
        let available = project(
            ResponseShape::Boolean,
            vec![begin(&["available"]), row(vec![SqlValue::Int(1)]), DbEvent::EndResult, DbEvent::Done],
        )
        .await;
        assert_eq!(body(&available), "true");

        let id = project(
            ResponseShape::Integer,
            vec![begin(&["id"]), row(vec!["17".into()]), DbEvent::EndResult, DbEvent::Done],
        )
        .await;
        assert_eq!(body(&id), "17");

        let ok = project(ResponseShape::Ok, vec![DbEvent::Done]).await;
        assert_eq!(body(&ok), r#""ok""#);
    }

    #[tokio::test]
    async fn test_scalar_shapes_require_a_row() {
        let available = project(
            ResponseShape::Boolean,
            vec![begin(&["available"]), DbEvent::EndResult, DbEvent::Done],
        )
        .await;
        assert_eq!(available.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!available.is_json());
        assert_eq!(body(&available), "No row for bool result");

        let id = project(
            ResponseShape::Integer,
            vec![begin(&["id"]), DbEvent::EndResult, DbEvent::Done],
        )
        .await;
        assert_eq!(id.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&id), "No row for u64 result");
    }

    #[tokio::test]
    async fn test_ok_rejects_result_sets() {
        let reply = project(
            ResponseShape::Ok,
            vec![begin(&["x"]), DbEvent::EndResult, DbEvent::Done],
        )
        .await;
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_redirect_shape() {
        let reply = project(
            ResponseShape::Redirect,
            vec![
                begin(&["url"]),
                row(vec!["https://cdn.example.com/a.stl".into()]),
                DbEvent::EndResult,
                DbEvent::Done,
            ],
        )
        .await;
        assert_eq!(reply.status(), REDIRECT_STATUS);
        assert_eq!(reply.location(), Some("https://cdn.example.com/a.stl"));
        assert!(reply.body().is_empty());

        let missing = project(
            ResponseShape::Redirect,
            vec![begin(&["url"]), DbEvent::EndResult, DbEvent::Done],
        )
        .await;
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_out_of_order_events() {
        let reply = project(ResponseShape::List, vec![row(vec!["x".into()])]).await;
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&reply), "Unexpected DB event row while idle");

        let reply = project(
            ResponseShape::List,
            vec![begin(&["a", "b"]), row(vec!["x".into()])],
        )
        .await;
        assert_eq!(body(&reply), "Row has 1 columns but result set declares 2");
    }

    #[tokio::test]
    async fn test_truncated_stream_releases_connection() {
        let released = Arc::new(AtomicBool::new(false));
        let events = Tracked {
            inner: stream::iter(vec![begin(&["name"]), row(vec!["alice".into()])]),
            released: Arc::clone(&released),
        };

        let reply = projector(ResponseShape::List).run(events).await;
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&reply), "Database connection lost");
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_error_releases_connection() {
        let released = Arc::new(AtomicBool::new(false));
        let events = Tracked {
            inner: stream::iter(vec![DbEvent::Error(DbError::new(1, "boom"))])
                .chain(stream::pending()),
            released: Arc::clone(&released),
        };

        let reply = projector(ResponseShape::List).run(events).await;
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_abandoned_projection_releases_connection() {
        let released = Arc::new(AtomicBool::new(false));
        let events = Tracked {
            inner: stream::iter(vec![begin(&["name"])]).chain(stream::pending()),
            released: Arc::clone(&released),
        };

        let run = projector(ResponseShape::List).run(events);
        let outcome = tokio::time::timeout(Duration::from_millis(20), run).await;
        assert!(outcome.is_err());
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_events_after_close_are_rejected() {
        let mut p = projector(ResponseShape::Ok);
        assert!(matches!(p.handle(DbEvent::Done), Step::Finished(_)));
        assert_eq!(p.state(), ProjectionState::Closed);

        let Step::Finished(reply) = p.handle(DbEvent::Done) else {
            panic!("closed projector must not continue");
        };
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

//! In-process database backend.
//!
//! Serves canned result sets keyed by procedure name. Used for local runs
//! without a database server and throughout the test suite.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use futures_util::stream::{self, StreamExt};
use serde::Deserialize;

use crate::db::{Column, Database, DbError, DbEvent, EventStream, ProcedureCall, Row, SqlValue};

/// MySQL `ER_SP_DOES_NOT_EXIST`.
pub const ER_SP_DOES_NOT_EXIST: u32 = 1305;

/// Error loading a fixtures file.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One canned result set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSetFixture {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<SqlValue>>,
}

impl ResultSetFixture {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, values: Vec<SqlValue>) -> Self {
        self.rows.push(values);
        self
    }
}

/// Canned response of one procedure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcedureFixture {
    pub name: String,
    #[serde(default)]
    pub results: Vec<ResultSetFixture>,
    /// When set, emitted after the result sets instead of `Done`.
    #[serde(default)]
    pub error: Option<DbError>,
}

#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    procedures: Vec<ProcedureFixture>,
}

/// Database answering from fixtures.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    procedures: HashMap<String, ProcedureFixture>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load fixtures from a TOML file of `[[procedures]]` tables.
    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, FixtureError> {
        let file: FixtureFile = toml::from_str(content)?;
        let mut db = Self::new();
        for fixture in file.procedures {
            db.insert(fixture);
        }
        Ok(db)
    }

    pub fn insert(&mut self, fixture: ProcedureFixture) {
        self.procedures.insert(fixture.name.clone(), fixture);
    }

    /// Register a procedure returning the given result sets.
    pub fn with_results(mut self, name: &str, results: Vec<ResultSetFixture>) -> Self {
        self.insert(ProcedureFixture {
            name: name.to_string(),
            results,
            error: None,
        });
        self
    }

    /// Register a procedure that fails with a backend error.
    pub fn with_error(mut self, name: &str, code: u32, message: &str) -> Self {
        self.insert(ProcedureFixture {
            name: name.to_string(),
            results: Vec::new(),
            error: Some(DbError::new(code, message)),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

/// Flatten a fixture into the event sequence a live backend would produce.
fn fixture_events(fixture: &ProcedureFixture) -> Vec<DbEvent> {
    let mut events = Vec::new();
    for result in &fixture.results {
        events.push(DbEvent::BeginResult(
            result.columns.iter().map(Column::new).collect(),
        ));
        events.extend(
            result
                .rows
                .iter()
                .map(|values| DbEvent::Row(Row::new(values.clone()))),
        );
        events.push(DbEvent::EndResult);
    }
    events.push(match &fixture.error {
        Some(err) => DbEvent::Error(err.clone()),
        None => DbEvent::Done,
    });
    events
}

impl Database for MemoryDatabase {
    fn query(&self, call: ProcedureCall) -> EventStream {
        tracing::debug!(call = %call, "Memory backend query");

        let events = match self.procedures.get(&call.procedure) {
            Some(fixture) => fixture_events(fixture),
            None => vec![DbEvent::Error(DbError::new(
                ER_SP_DOES_NOT_EXIST,
                format!("PROCEDURE {} does not exist", call.procedure),
            ))],
        };

        stream::iter(events).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_sequence() {
        let db = MemoryDatabase::new().with_results(
            "GetLicenses",
            vec![ResultSetFixture::new(&["name"])
                .row(vec!["MIT".into()])
                .row(vec!["GPL".into()])],
        );

        let events: Vec<DbEvent> = db.query(ProcedureCall::new("GetLicenses")).collect().await;
        let kinds: Vec<&str> = events.iter().map(DbEvent::kind).collect();
        assert_eq!(kinds, ["begin-result", "row", "row", "end-result", "done"]);
    }

    #[tokio::test]
    async fn test_unknown_procedure() {
        let db = MemoryDatabase::new();
        let events: Vec<DbEvent> = db.query(ProcedureCall::new("Nope")).collect().await;
        match events.as_slice() {
            [DbEvent::Error(err)] => assert_eq!(err.code, ER_SP_DOES_NOT_EXIST),
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_from_toml() {
        let db = MemoryDatabase::from_toml(
            r#"
            [[procedures]]
            name = "GetTags"
            [[procedures.results]]
            columns = ["tag", "count"]
            rows = [["robots", 12], ["lasers", 3]]

            [[procedures]]
            name = "GetProfile"
            error = { code = 1643, message = "Profile not found" }
            "#,
        )
        .unwrap();

        assert_eq!(db.len(), 2);
        let tags = &db.procedures["GetTags"].results[0];
        assert_eq!(tags.rows[0], vec![SqlValue::Text("robots".into()), SqlValue::Int(12)]);
        assert_eq!(db.procedures["GetProfile"].error.as_ref().unwrap().code, 1643);
    }
}

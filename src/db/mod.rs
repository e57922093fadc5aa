//! Database backend abstraction.
//!
//! # Data Flow
//! ```text
//! ProcedureHandler
//!     → ProcedureCall (procedure name + bound parameters)
//!     → Database::query()
//!     → EventStream: BeginResult, Row*, EndResult, ..., Done | Error
//!     → projection::Projector
//! ```
//!
//! # Design Decisions
//! - Query results are delivered as explicit event values, never through a
//!   shared cursor object
//! - Dropping the stream releases the underlying connection
//! - Column metadata travels with `BeginResult`; rows carry values only

pub mod memory;

use std::fmt;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub use memory::MemoryDatabase;

/// Asynchronous sequence of events produced by one query.
pub type EventStream = BoxStream<'static, DbEvent>;

/// A backend capable of executing stored-procedure calls.
pub trait Database: Send + Sync {
    /// Start executing `call`. Events are pulled lazily from the returned stream.
    fn query(&self, call: ProcedureCall) -> EventStream;
}

/// One event of a query's result stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DbEvent {
    /// A new result set starts.
    BeginResult(Vec<Column>),
    /// One row of the current result set.
    Row(Row),
    /// The current result set is complete.
    EndResult,
    /// The query finished successfully.
    Done,
    /// The query failed.
    Error(DbError),
}

impl DbEvent {
    /// Short name used in logs and protocol errors.
    pub fn kind(&self) -> &'static str {
        match self {
            DbEvent::BeginResult(_) => "begin-result",
            DbEvent::Row(_) => "row",
            DbEvent::EndResult => "end-result",
            DbEvent::Done => "done",
            DbEvent::Error(_) => "error",
        }
    }
}

/// Result set column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Backend error reported through the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbError {
    pub code: u32,
    pub message: String,
}

impl DbError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DB:{}: {}", self.code, self.message)
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::UInt(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

/// Typed column access failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("column {index} out of range ({count} columns)")]
    OutOfRange { index: usize, count: usize },

    #[error("column {index} is not a {expected}")]
    Type { index: usize, expected: &'static str },
}

/// One row of a result set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn column_count(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Result<&SqlValue, RowError> {
        self.values.get(index).ok_or(RowError::OutOfRange {
            index,
            count: self.values.len(),
        })
    }

    /// Boolean view of a column. Integer columns are true when non-zero.
    pub fn get_bool(&self, index: usize) -> Result<bool, RowError> {
        let err = RowError::Type {
            index,
            expected: "boolean",
        };
        match self.get(index)? {
            SqlValue::Bool(b) => Ok(*b),
            SqlValue::Int(i) => Ok(*i != 0),
            SqlValue::UInt(u) => Ok(*u != 0),
            SqlValue::Text(s) => match s.as_str() {
                "1" | "true" => Ok(true),
                "0" | "false" => Ok(false),
                _ => Err(err),
            },
            _ => Err(err),
        }
    }

    pub fn get_u64(&self, index: usize) -> Result<u64, RowError> {
        let err = RowError::Type {
            index,
            expected: "unsigned integer",
        };
        match self.get(index)? {
            SqlValue::UInt(u) => Ok(*u),
            SqlValue::Int(i) => u64::try_from(*i).map_err(|_| err),
            SqlValue::Text(s) => s.parse().map_err(|_| err),
            _ => Err(err),
        }
    }

    pub fn get_str(&self, index: usize) -> Result<&str, RowError> {
        match self.get(index)? {
            SqlValue::Text(s) => Ok(s),
            _ => Err(RowError::Type {
                index,
                expected: "string",
            }),
        }
    }
}

impl From<Vec<SqlValue>> for Row {
    fn from(values: Vec<SqlValue>) -> Self {
        Self::new(values)
    }
}

/// A stored-procedure invocation with parameters bound by name.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    pub procedure: String,
    pub params: Vec<(String, SqlValue)>,
}

impl ProcedureCall {
    pub fn new(procedure: impl Into<String>) -> Self {
        Self {
            procedure: procedure.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, name: impl Into<String>, value: SqlValue) -> Self {
        self.params.push((name.into(), value));
        self
    }

    pub fn param(&self, name: &str) -> Option<&SqlValue> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl fmt::Display for ProcedureCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CALL {}(", self.procedure)?;
        for (i, (name, _)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "%({})", name)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let row = Row::new(vec![
            SqlValue::Int(1),
            SqlValue::Text("42".into()),
            SqlValue::Null,
        ]);

        assert!(row.get_bool(0).unwrap());
        assert_eq!(row.get_u64(1).unwrap(), 42);
        assert_eq!(row.get_str(1).unwrap(), "42");
        assert!(row.get_bool(2).is_err());
        assert_eq!(
            row.get(3),
            Err(RowError::OutOfRange { index: 3, count: 3 })
        );
    }

    #[test]
    fn test_negative_is_not_u64() {
        let row = Row::new(vec![SqlValue::Int(-5)]);
        assert!(matches!(row.get_u64(0), Err(RowError::Type { .. })));
    }

    #[test]
    fn test_value_serialization() {
        let values = vec![
            SqlValue::Null,
            SqlValue::Bool(true),
            SqlValue::Int(-3),
            SqlValue::Text("a\"b".into()),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,true,-3,"a\"b"]"#);
    }

    #[test]
    fn test_call_display() {
        let call = ProcedureCall::new("GetThing")
            .bind("profile", "alice".into())
            .bind("thing", "robot".into());
        assert_eq!(call.to_string(), "CALL GetThing(%(profile), %(thing))");
        assert_eq!(call.param("thing"), Some(&SqlValue::Text("robot".into())));
    }
}

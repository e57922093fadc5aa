//! Field programs: how each successive result set is shaped.
//!
//! Textual form is a whitespace-separated token list. A token starting with
//! [`MERGE_MARKER`] names a merged field, any other token names a list:
//!
//! ```text
//! *profile things followers
//! ```
//!
//! yields `{"profile": <single row>, "things": [...], "followers": [...]}`
//! for a query producing three result sets.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Prefix marking a merged-dict field in the textual form.
pub const MERGE_MARKER: char = '*';

/// How a result set is represented in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Every row is appended to a JSON array.
    List,
    /// The result set is folded into a single value.
    Merged,
}

/// One entry of a field program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn list(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::List,
        }
    }

    pub fn merged(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Merged,
        }
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FieldKind::List => write!(f, "{}", self.name),
            FieldKind::Merged => write!(f, "{}{}", MERGE_MARKER, self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldProgramError {
    #[error("field token {0:?} has no name after the merge marker")]
    MissingName(String),
}

/// Ordered field descriptors with a read cursor.
///
/// The descriptor list is shared; cloning a program is cheap and yields an
/// independent cursor, so a handler parses once and clones per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProgram {
    fields: Arc<[FieldDescriptor]>,
    cursor: usize,
}

impl FieldProgram {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self {
            fields: fields.into(),
            cursor: 0,
        }
    }

    /// A program expecting no result sets.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn parse(text: &str) -> Result<Self, FieldProgramError> {
        let fields = text
            .split_whitespace()
            .map(|token| match token.strip_prefix(MERGE_MARKER) {
                Some("") => Err(FieldProgramError::MissingName(token.to_string())),
                Some(name) => Ok(FieldDescriptor::merged(name)),
                None => Ok(FieldDescriptor::list(token)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(fields))
    }

    /// Advance the cursor. `None` once exhausted, and on every later call.
    pub fn next(&mut self) -> Option<&FieldDescriptor> {
        let field = self.fields.get(self.cursor)?;
        self.cursor += 1;
        Some(field)
    }

    pub fn remaining(&self) -> usize {
        self.fields.len() - self.cursor
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn descriptors(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// A copy of this program with the cursor at the start.
    pub fn rewound(&self) -> Self {
        Self {
            fields: Arc::clone(&self.fields),
            cursor: 0,
        }
    }
}

impl FromStr for FieldProgram {
    type Err = FieldProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

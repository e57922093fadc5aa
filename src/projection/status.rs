//! Backend error code → HTTP status mapping.

use std::collections::HashMap;

use axum::http::StatusCode;

/// MySQL `ER_SIGNAL_NOT_FOUND`, raised by procedures that `SIGNAL` a missing row.
pub const ER_SIGNAL_NOT_FOUND: u32 = 1643;

/// Small lookup table from backend error codes to response statuses.
/// Unlisted codes map to `500 Internal Server Error`.
#[derive(Debug, Clone)]
pub struct ErrorStatusMap {
    entries: HashMap<u32, StatusCode>,
}

impl ErrorStatusMap {
    /// A table with no entries; every code maps to 500.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, code: u32, status: StatusCode) {
        self.entries.insert(code, status);
    }

    pub fn with(mut self, code: u32, status: StatusCode) -> Self {
        self.insert(code, status);
        self
    }

    pub fn status_for(&self, code: u32) -> StatusCode {
        self.entries
            .get(&code)
            .copied()
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl Default for ErrorStatusMap {
    fn default() -> Self {
        Self::empty().with(ER_SIGNAL_NOT_FOUND, StatusCode::NOT_FOUND)
    }
}

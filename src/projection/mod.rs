//! Result projection subsystem.
//!
//! # Data Flow
//! ```text
//! Handler
//!     → ResponseShape (+ FieldProgram for `fields`)
//!     → Database::query → DbEvent stream
//!     → projector.rs (state machine, one event at a time)
//!     → writer.rs (nested JSON emitter)
//!     → ApiReply (application/json, redirect, or text/plain error)
//! ```
//!
//! # Design Decisions
//! - One projector, one writer and one field program per request
//! - Backend error codes map to HTTP statuses through a small table
//! - Nothing in the projector is retried

pub mod fields;
pub mod projector;
pub mod status;
pub mod writer;

pub use fields::{FieldDescriptor, FieldKind, FieldProgram, FieldProgramError};
pub use projector::{ProjectionError, ProjectionState, Projector, ResponseShape, Step};
pub use status::ErrorStatusMap;
pub use writer::{DocumentWriter, WriterError};

//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization header
//!     → auth.rs (API key → User)
//!     → ApiRequest.user
//!     → per-route requirement checked by api::ProcedureHandler
//! ```
//!
//! # Design Decisions
//! - Identification and authorization are separate: an unknown key is an
//!   anonymous caller, and only routes that require a user reject it
//! - Request body size is capped in the HTTP layer

pub mod auth;

pub use auth::{Authenticator, User};

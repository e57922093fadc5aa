//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, args)
//!     → router.rs (ordered scan)
//!     → matcher.rs (method mask, anchored regex, captures → args)
//!     → child HttpHandler (Some(reply) = handled, None = try next)
//!     → NotFound when nothing handled it
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Compile patterns (PatternError is fatal)
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - First match wins, in registration order
//! - Deterministic: same input always matches same route

pub mod handler;
pub mod matcher;
pub mod method;
pub mod router;

pub use handler::HttpHandler;
pub use matcher::{PatternError, PatternMatcher};
pub use method::{MethodSet, UnknownMethod};
pub use router::{NotFound, Router};

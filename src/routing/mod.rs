//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, query)
//!     → router.rs (canonical-path and trailing-slash redirects)
//!     → router.rs (exact lookup, then longest subtree)
//!     → matcher.rs (evaluate pattern)
//!     → Return: matched route, redirect, or NotFound
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Classify each source (exact / subtree)
//!     → Reject empty, relative and duplicate sources
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - Most specific match wins, regardless of registration order

pub mod matcher;
pub mod router;

pub use matcher::{clean_path, Pattern, RoutingError};
pub use router::{Resolution, RouteTable};

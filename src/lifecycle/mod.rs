//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Upstream client → Route table → Bind listener
//!
//! Running:
//!     supervisor.rs: command exits → publish exit code → trigger shutdown
//!     signals.rs: SIGINT/SIGTERM → forward to command, or trigger shutdown
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Drain connections → Collect exit code → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then routes, then the listener
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: connections are aborted after the drain deadline

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod supervisor;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{build_routes, Proxy, StartupError};
pub use supervisor::{ChildGroup, Supervisor, SupervisorHandle, SupervisorState};

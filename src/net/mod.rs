//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept)
//!     → connection.rs (task tracking, drain on shutdown)
//!     → Hand off to HTTP layer
//!
//! Outgoing request
//!     → transport.rs (shared upstream client, body streaming)
//! ```
//!
//! # Design Decisions
//! - Each connection is a tracked task so shutdown can wait for it
//! - One upstream client for the whole process (pooled connections)
//! - Plain TCP on the listening side; TLS only towards https upstreams

pub mod connection;
pub mod listener;
pub mod transport;

pub use connection::{ConnectionId, Connections, DrainOutcome};
pub use listener::{Listener, ListenerError};
pub use transport::{TransportError, Upstream};

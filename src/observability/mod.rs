//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!     → tower-http request spans (verbose only)
//!
//! Consumer:
//!     → logging.rs (fmt layer on stderr)
//! ```

pub mod logging;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line
//!     → cli.rs (clap, legacy single-dash flags)
//!     → parser.rs (one RouteConfig per `<path>=<target>`)
//!     → validation.rs (semantic checks)
//!     → loader.rs (assemble ProxyConfig)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - Fixed timeouts live in the config so tests can shorten them
//! - Parsing fails on the first bad argument; validation reports every problem

pub mod cli;
pub mod loader;
pub mod parser;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{load_config, ConfigError};
pub use parser::{parse_route, ParseError};
pub use schema::{ListenerConfig, ProxyConfig, RouteConfig, Scheme, TimeoutConfig};
pub use validation::ValidationError;

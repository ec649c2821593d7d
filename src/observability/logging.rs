//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once, at startup
//! - Derive the log level from the verbose flag
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Output goes to stderr; stdout belongs to the supervised command
//! - The filter is fixed by the flag; no environment variable is consulted

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used with `--verbose`.
pub const VERBOSE_FILTER: &str = "path_proxy=debug,tower_http=debug";

/// Filter used otherwise: warnings and errors only.
pub const QUIET_FILTER: &str = "path_proxy=warn";

pub fn filter_directives(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        QUIET_FILTER
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(filter_directives(verbose)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

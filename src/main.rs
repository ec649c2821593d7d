//! path-proxy
//!
//! Forwards requests to upstream origins chosen by path prefix, optionally
//! tying its lifetime to a child command.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ net::listener ──▶ http::server ──▶ routing::RouteTable
//!                                                              │
//!                                                              ▼
//!     Client Response                                   http::proxy (per route)
//!     ◀────────────── http::response ◀── net::transport ◀──────┘
//!                                               │
//!                                               ▼
//!                                            Upstream
//!
//!     lifecycle::supervisor: command exits ──▶ shutdown ──▶ exit with its code
//! ```
//!
//! # Usage
//!
//! ```text
//! path-proxy [--addr :9001] [--verbose] [--insecure] /a=http://localhost:4000/b ... [-- command args...]
//! ```

use std::process::ExitCode;

use path_proxy::config::{load_config, Cli};
use path_proxy::observability::logging;
use path_proxy::Proxy;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let verbose = cli.verbose;
    logging::init(verbose);

    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("path-proxy: {e}");
            return ExitCode::from(2);
        }
    };

    let proxy = match Proxy::bind(config).await {
        Ok(proxy) => proxy,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("path-proxy: {e}");
            return ExitCode::from(e.exit_code());
        }
    };

    match proxy.run().await {
        Ok(code) => exit_code(code),
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            eprintln!("path-proxy: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Exit statuses are truncated to their low byte, as the OS reports them.
fn exit_code(code: i32) -> ExitCode {
    ExitCode::from((code & 0xff) as u8)
}

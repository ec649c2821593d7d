//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection
//!     → server.rs (Axum app, HTTP/1.1 + h2c, drain on shutdown)
//!     → routing::RouteTable::resolve (match, redirect or 404)
//!     → proxy.rs (one handler per route)
//!     → request.rs (path rewrite, forwarding headers)
//!     → net::transport (upstream call)
//!     → response.rs (relay, or 502)
//!     → Send to client
//! ```

pub mod headers;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use headers::{X_FORWARDED_FOR, X_FORWARDED_HOST};
pub use proxy::ProxyHandler;
pub use server::{HttpServer, ServerError};

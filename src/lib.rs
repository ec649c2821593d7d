//! Path-based reverse proxy library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::{Proxy, Shutdown};

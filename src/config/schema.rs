//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! Everything here is built once from the command line and never mutated
//! afterwards.

use std::fmt;
use std::time::Duration;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route definitions, in command-line order.
    pub routes: Vec<RouteConfig>,

    /// Supervised command and its arguments. Empty when no command was given.
    pub command: Vec<String>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Emit diagnostic trace lines.
    pub verbose: bool,
}

impl ProxyConfig {
    /// Returns true when a child process should be supervised.
    pub fn has_command(&self) -> bool {
        !self.command.is_empty()
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Bind address (e.g., ":9001", "127.0.0.1:9001").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: ":9001".to_string(),
        }
    }
}

/// Timeout configuration for the two bounded operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// How long in-flight requests may run after shutdown begins, in seconds.
    pub drain_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_secs(self.drain_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            drain_secs: 5,
        }
    }
}

/// Outbound connection scheme for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl Scheme {
    /// Scheme used when a target omits one.
    pub fn default_for(insecure: bool) -> Self {
        if insecure {
            Scheme::Http
        } else {
            Scheme::Https
        }
    }

    /// Parses a scheme name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("http") {
            Some(Scheme::Http)
        } else if name.eq_ignore_ascii_case("https") {
            Some(Scheme::Https)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single route: inbound path prefix to upstream authority and path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RouteConfig {
    /// Path pattern that selects this route.
    pub source_path: String,

    /// Path prefix substituted into the outbound request.
    pub destination_path: String,

    /// Upstream authority (`host[:port]`). May be empty for degenerate input.
    pub host: String,

    /// Outbound connection scheme.
    pub scheme: Scheme,

    /// Emit per-request trace lines for this route.
    pub verbose: bool,
}

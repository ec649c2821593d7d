//! TCP listener setup.
//!
//! # Responsibilities
//! - Normalise the configured listen address (`:port` means all interfaces)
//! - Bind to it, resolving host names
//! - Accept incoming TCP connections
//!
//! # Design Decisions
//! - No connection limit: every accepted connection is served
//! - Bind errors are fatal, accept errors are reported to the caller

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Failed to accept connection.
    #[error("failed to accept: {0}")]
    Accept(#[source] io::Error),
}

/// Expand a `:port` address to `0.0.0.0:port`.
pub fn normalize_bind_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

/// A bound TCP listener.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind to the configured address.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr = normalize_bind_address(&config.bind_address);
        let inner = TcpListener::bind(&addr)
            .await
            .map_err(|source| ListenerError::Bind {
                addr: config.bind_address.clone(),
                source,
            })?;

        tracing::debug!(address = %addr, "Listener bound");

        Ok(Self { inner })
    }

    /// Accept a new connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        self.inner.accept().await.map_err(ListenerError::Accept)
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, io::Error> {
        self.inner.local_addr()
    }
}

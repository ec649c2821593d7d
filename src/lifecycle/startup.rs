//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the shared upstream client and the route table from configuration
//! - Bind the listener
//! - Start the supervised command, serve, and collect the exit code
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener is bound last, once every route is known to be valid

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{ProxyConfig, RouteConfig};
use crate::http::{HttpServer, ProxyHandler, ServerError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::lifecycle::supervisor::{Supervisor, SupervisorHandle};
use crate::net::listener::{Listener, ListenerError};
use crate::net::transport::{TransportError, Upstream};
use crate::routing::{RouteTable, RoutingError};

/// Error type for starting and running the proxy.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

impl StartupError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::Routing(_) => 2,
            _ => 1,
        }
    }
}

/// Build the route table, one handler per route sharing `upstream`.
pub fn build_routes(
    routes: &[RouteConfig],
    upstream: &Upstream,
) -> Result<RouteTable<ProxyHandler>, RoutingError> {
    RouteTable::from_routes(routes.iter().map(|route| {
        (
            route.source_path.as_str(),
            ProxyHandler::new(route.clone(), upstream.clone()),
        )
    }))
}

/// A configured proxy with its listener bound.
#[derive(Debug)]
pub struct Proxy {
    config: Arc<ProxyConfig>,
    routes: Arc<RouteTable<ProxyHandler>>,
    listener: Listener,
}

impl Proxy {
    pub async fn bind(config: ProxyConfig) -> Result<Self, StartupError> {
        let upstream = Upstream::new(config.timeouts.connect())?;
        let routes = build_routes(&config.routes, &upstream)?;

        if config.verbose {
            for (pattern, handler) in routes.iter() {
                let route = handler.route();
                tracing::info!("{} => {}{}", pattern, route.host, route.destination_path);
            }
        }

        let listener = Listener::bind(&config.listener).await?;
        if config.verbose {
            tracing::info!(address = %config.listener.bind_address, "Listening");
        }

        Ok(Self {
            config: Arc::new(config),
            routes: Arc::new(routes),
            listener,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the command exits or a termination signal arrives.
    ///
    /// Returns the command's exit code, or 0 without a command.
    pub async fn run(self) -> Result<i32, StartupError> {
        self.serve(Shutdown::new(), true).await
    }

    /// Serve until the command exits or `shutdown` is triggered. No signal handling.
    pub async fn run_until(self, shutdown: Shutdown) -> Result<i32, StartupError> {
        self.serve(shutdown, false).await
    }

    async fn serve(self, shutdown: Shutdown, handle_signals: bool) -> Result<i32, StartupError> {
        let supervisor = self.config.has_command().then(|| {
            Supervisor::new(self.config.command.clone(), self.config.verbose)
                .start(shutdown.clone())
        });

        let signal_task = handle_signals.then(|| {
            let group = supervisor.as_ref().map(SupervisorHandle::group);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = signals::handle_signals(shutdown, group).await {
                    tracing::warn!(error = %e, "Failed to install signal handlers");
                }
            })
        });

        let server = HttpServer::new(Arc::clone(&self.routes), self.config.timeouts.drain());
        let served = server.run(self.listener, shutdown.subscribe()).await;

        if let Some(task) = signal_task {
            task.abort();
        }

        let code = match supervisor {
            Some(handle) => handle.finish().await,
            None => 0,
        };

        served?;
        Ok(code)
    }
}

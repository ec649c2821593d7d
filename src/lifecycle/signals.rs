//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for SIGINT and SIGTERM (Ctrl-C elsewhere)
//! - Forward the first one to the supervised command's process group
//! - Trigger graceful shutdown when there is no command, or on a second signal
//!
//! # Design Decisions
//! - The command decides how to react to the forwarded signal; the proxy
//!   keeps serving until it exits
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are registered before the loop starts, so no signal between
//!   registration and the first wait is lost

use std::io;

use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::supervisor::ChildGroup;

/// Registered termination signal handlers.
#[cfg(unix)]
#[derive(Debug)]
pub struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    /// Register for SIGINT and SIGTERM. From here on they no longer terminate the process.
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Handle signals until shutdown has been requested.
    pub async fn handle(mut self, shutdown: Shutdown, child: Option<ChildGroup>) {
        let mut forwarded = false;

        loop {
            let received = tokio::select! {
                _ = self.interrupt.recv() => libc::SIGINT,
                _ = self.terminate.recv() => libc::SIGTERM,
            };

            if shutdown.is_triggered() {
                tracing::debug!(signal = received, "Shutdown already in progress");
                return;
            }

            match &child {
                Some(group) if !forwarded && group.signal(received) => {
                    forwarded = true;
                    tracing::info!(signal = received, pid = ?group.pid(), "Forwarded signal to command");
                }
                _ => {
                    tracing::info!(signal = received, "Shutdown requested");
                    shutdown.trigger();
                    return;
                }
            }
        }
    }
}

/// Handle termination signals until shutdown has been requested.
#[cfg(unix)]
pub async fn handle_signals(shutdown: Shutdown, child: Option<ChildGroup>) -> io::Result<()> {
    Signals::install()?.handle(shutdown, child).await;
    Ok(())
}

/// Handle Ctrl-C until shutdown has been requested.
#[cfg(not(unix))]
pub async fn handle_signals(shutdown: Shutdown, _child: Option<ChildGroup>) -> io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    shutdown.trigger();
    Ok(())
}

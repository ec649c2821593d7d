//! Connection lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Own the task of every live connection
//! - Drain connections on shutdown, force-closing stragglers after a deadline

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinSet;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn next() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// How a drain finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every connection finished within the deadline.
    Completed,
    /// The deadline passed; this many connections were aborted.
    Forced(usize),
}

/// The set of live connection tasks.
#[derive(Debug, Default)]
pub struct Connections {
    tasks: JoinSet<()>,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a connection on its own task.
    pub fn spawn<F>(&mut self, connection: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(connection);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for the next connection to finish, pending forever when there are none.
    pub async fn reap(&mut self) {
        match self.tasks.join_next().await {
            Some(Err(e)) if e.is_panic() => {
                tracing::error!(error = %e, "Connection task panicked");
            }
            Some(_) => {}
            None => std::future::pending().await,
        }
    }

    /// Wait up to `timeout` for every connection to finish, then abort the rest.
    pub async fn drain(mut self, timeout: Duration) -> DrainOutcome {
        let finished = tokio::time::timeout(timeout, async {
            while self.tasks.join_next().await.is_some() {}
        })
        .await;

        match finished {
            Ok(()) => DrainOutcome::Completed,
            Err(_) => {
                let remaining = self.tasks.len();
                self.tasks.shutdown().await;
                DrainOutcome::Forced(remaining)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::next();
        let id2 = ConnectionId::next();
        assert_ne!(id1, id2);
        assert_ne!(id1.to_string(), id2.to_string());
        assert!(id1.to_string().starts_with("conn-"));
    }

    #[tokio::test]
    async fn drain_completes_when_tasks_finish() {
        let mut connections = Connections::new();
        connections.spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
        });
        assert_eq!(
            connections.drain(Duration::from_secs(1)).await,
            DrainOutcome::Completed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn drain_aborts_stragglers() {
        let mut connections = Connections::new();
        connections.spawn(async {});
        connections.spawn(std::future::pending());
        connections.spawn(std::future::pending());
        tokio::task::yield_now().await;

        assert_eq!(
            connections.drain(Duration::from_secs(5)).await,
            DrainOutcome::Forced(2)
        );
    }
}

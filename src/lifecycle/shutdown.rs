//! Shutdown coordination for the proxy.

use std::sync::Arc;

use tokio::sync::watch;

/// Coordinator for graceful shutdown.
///
/// Every long-running task holds a [`ShutdownSignal`]. Triggering is one-shot:
/// once set the flag never clears, so late subscribers observe it too.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Request shutdown. Returns `true` only for the call that flipped the flag.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|triggered| {
            if *triggered {
                false
            } else {
                *triggered = true;
                true
            }
        })
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been triggered.
    pub async fn recv(&mut self) {
        if self.rx.wait_for(|triggered| *triggered).await.is_err() {
            // Coordinator dropped without triggering: nothing will ever fire.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn trigger_wakes_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();

        assert!(shutdown.trigger());

        tokio::time::timeout(Duration::from_secs(1), a.recv())
            .await
            .expect("first subscriber woke");
        tokio::time::timeout(Duration::from_secs(1), b.recv())
            .await
            .expect("second subscriber woke");
    }

    #[tokio::test]
    async fn only_first_trigger_reports_true() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        assert!(shutdown.trigger());
        assert!(!shutdown.trigger());
        assert!(shutdown.clone().is_triggered());
    }

    #[tokio::test]
    async fn late_subscriber_sees_earlier_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let mut late = shutdown.subscribe();
        tokio::time::timeout(Duration::from_secs(1), late.recv())
            .await
            .expect("late subscriber woke");
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_coordinator_never_fires() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        drop(shutdown);

        let waited = tokio::time::timeout(Duration::from_secs(60), signal.recv()).await;
        assert!(waited.is_err());
    }
}

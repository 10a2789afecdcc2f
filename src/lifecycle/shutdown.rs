//! Shutdown coordination for the gateway.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// The HTTP server, the admin server and the idempotency sweeper each hold a
/// receiver and stop when the signal fires.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Tasks that subscribe afterwards will not see it.
    pub fn trigger(&self) {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::info!(tasks = notified, "Shutdown triggered");
    }

    /// Number of tasks still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

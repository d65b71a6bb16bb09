//! Shutdown coordination for the pipeline.
//!
//! Wraps a broadcast channel acting as the shared stop flag plus wake-all
//! primitive: triggering wakes every blocked worker, and each worker
//! re-checks the signal after any wake before deciding to exit.

use tokio::sync::broadcast;

/// Coordinator for cooperative worker shutdown.
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe before spawning a worker; the receiver resolves once
    /// shutdown has been triggered, even if the worker was mid-wait at
    /// trigger time.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger shutdown, waking every subscribed worker.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of workers still subscribed (not yet exited).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

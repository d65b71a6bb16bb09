//! Bounded execution pool for dispatched handlers.
//!
//! # Responsibilities
//! - Run each dispatched handler as its own task
//! - Bound how many handlers execute concurrently
//! - Isolate handler faults from the pipeline
//!
//! # Design Decisions
//! - Submission never blocks the dispatcher: the permit is acquired inside
//!   the spawned task, so the bound limits execution, not submission
//! - A panicking handler is caught and logged at the task boundary

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::Semaphore;

/// Pool of handler tasks with a fixed concurrency cap.
#[derive(Clone)]
pub struct HandlerPool {
    permits: Arc<Semaphore>,
}

impl HandlerPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity.max(1))),
        }
    }

    /// Submit one unit of handler work. Returns immediately.
    pub fn submit(&self, work: BoxFuture<'static, ()>) {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            // Closed only at process exit; nothing left to run then.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if let Err(panic) = std::panic::AssertUnwindSafe(work).catch_unwind().await {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::error!(detail = %detail, "handler panicked");
            }
        });
    }
}

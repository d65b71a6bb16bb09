//! Outbound API surface and request/response correlation.
//!
//! # Responsibilities
//! - Allocate echo ids and track outstanding request completions
//! - Enqueue outbound payloads without ever blocking the caller
//! - Deliver inbound API responses to their completion exactly once
//!
//! # Design Decisions
//! - The correlation table is the only runtime-mutable core structure;
//!   it uses a concurrent map keyed by echo id
//! - A completion with no matching response stays pending; callers apply
//!   their own bounded wait and treat expiry as unknown outcome

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

use crate::event::{ApiResponse, Event};
use crate::observability::metrics;

/// Outstanding request completions, keyed by echo id.
///
/// Entries are created on send and removed on the first matching response,
/// so a completion fires at most once.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    pending: DashMap<u64, oneshot::Sender<ApiResponse>>,
    next_id: AtomicU64,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completion and return its freshly allocated echo id.
    pub fn register(&self, completion: oneshot::Sender<ApiResponse>) -> u64 {
        // Relaxed suffices: ids only need uniqueness.
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending.insert(id, completion);
        id
    }

    /// Deliver a response to the completion registered under `id`.
    ///
    /// Returns `false` when the id is unknown (already consumed, or never
    /// sent); such responses are ignored.
    pub fn complete(&self, id: u64, response: ApiResponse) -> bool {
        match self.pending.remove(&id) {
            Some((_, completion)) => {
                // The caller may have given up waiting; that is not an error.
                let _ = completion.send(response);
                true
            }
            None => {
                tracing::debug!(echo = id, "response for unknown echo id ignored");
                false
            }
        }
    }

    /// Drop a pending completion, e.g. when its payload could not be
    /// enqueued.
    pub fn discard(&self, id: u64) {
        self.pending.remove(&id);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Handle to the outbound API surface, handed to every dispatched handler.
///
/// Cloning is cheap; all clones share the correlation table and the
/// outbound queue.
#[derive(Clone)]
pub struct ApiHandle {
    outbound: mpsc::UnboundedSender<String>,
    table: Arc<CorrelationTable>,
    call_timeout: Duration,
}

impl ApiHandle {
    pub fn new(
        outbound: mpsc::UnboundedSender<String>,
        table: Arc<CorrelationTable>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            outbound,
            table,
            call_timeout,
        }
    }

    /// Send an API request without blocking.
    ///
    /// The payload is annotated with a fresh echo id, the completion is
    /// recorded under that id, and the payload is queued for the writer
    /// workers. Returns the echo id.
    pub fn send_request(
        &self,
        mut payload: Value,
        completion: oneshot::Sender<ApiResponse>,
    ) -> u64 {
        let id = self.table.register(completion);
        match payload.as_object_mut() {
            Some(doc) => {
                doc.insert("echo".to_string(), json!(id));
            }
            // Not an object: send as-is; the response can never correlate,
            // so the caller's bounded wait reports unknown outcome.
            None => tracing::warn!(echo = id, "request payload is not an object"),
        }
        metrics::record_api_request();
        if self.outbound.send(payload.to_string()).is_err() {
            // Session already torn down; the completion would never fire.
            tracing::warn!(echo = id, "outbound queue closed, dropping request");
            self.table.discard(id);
        }
        id
    }

    /// Send a request and wait for its response with the configured bound.
    ///
    /// `None` means the bound expired: the outcome of the request is
    /// unknown, not necessarily failed.
    pub async fn call(&self, payload: Value) -> Option<ApiResponse> {
        let (tx, rx) = oneshot::channel();
        let id = self.send_request(payload, tx);
        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(response)) => Some(response),
            Ok(Err(_)) | Err(_) => {
                self.table.discard(id);
                None
            }
        }
    }

    /// Reply to the message event with `text`, routed back to the group or
    /// private conversation it arrived through.
    pub async fn send_msg(&self, event: &Event, text: &str) -> Option<ApiResponse> {
        self.call(payload::send_msg(event, text)?).await
    }
}

/// Builders for the common outbound API payload shapes.
pub mod payload {
    use super::*;

    /// `send_msg` payload answering in kind: group events get a group
    /// message, private events a private one.
    pub fn send_msg(event: &Event, text: &str) -> Option<Value> {
        let params = match event.group_id() {
            Some(group_id) => json!({"group_id": group_id, "message": text}),
            None => json!({"user_id": event.user_id()?, "message": text}),
        };
        Some(json!({"action": "send_msg", "params": params}))
    }
}

//! Event routing engine.
//!
//! # Data Flow
//! ```text
//! Parsed document
//!     → classify (API response | message | notice | request | meta)
//!     → message: permission resolve → tier walk → trie/table lookup
//!     → notice/request: flat (type, sub_type) registry
//!     → matched handlers submitted to the bounded handler pool
//!
//! Table Compilation (at startup):
//!     RouterBuilder registrations
//!     → per-(kind, tier, directed) partitions
//!     → Freeze as immutable Router shared via Arc
//! ```
//!
//! # Design Decisions
//! - Tables compiled at startup, immutable at runtime (no locks on dispatch)
//! - The router is an explicitly constructed instance, never a global
//! - Handlers are one homogeneous callable type; trigger kind, permission
//!   level and direction are registration metadata
//! - Deterministic resolution: FullMatch → Prefix → Suffix, first hit wins

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::api::ApiHandle;
use crate::event::Event;
use crate::permission::PermissionLevel;

pub mod router;
pub mod trie;

pub use router::{Router, RouterBuilder};
pub use trie::Trie;

/// A registered event handler.
///
/// Handlers receive their own copy of the event and a handle to the
/// outbound API surface, and run on the bounded handler pool.
pub type Handler = Arc<dyn Fn(Event, ApiHandle) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async function or closure as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Event, ApiHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |event, api| Box::pin(f(event, api)))
}

/// Trigger strategy of a command registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Whole message equals the key.
    FullMatch,
    /// Message starts with the key; shortest registered key wins.
    Prefix,
    /// Message ends with the key; shortest registered key wins.
    Suffix,
    /// Alias of [`MatchKind::FullMatch`] in the current behavior.
    Keyword,
    /// Fallback invoked for any message when nothing else matched.
    CatchAll,
}

/// Registration failure. Duplicate keys are a startup misconfiguration and
/// must abort module loading.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate {kind:?} command {key:?} at {level:?} (directed: {directed})")]
    DuplicateCommand {
        kind: MatchKind,
        key: String,
        level: PermissionLevel,
        directed: bool,
    },
}

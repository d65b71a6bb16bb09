//! Gateway client library for a chat platform.

pub mod api;
pub mod config;
pub mod event;
pub mod lifecycle;
pub mod message;
pub mod observability;
pub mod permission;
pub mod routing;
pub mod session;
pub mod tasks;

pub use api::{ApiHandle, CorrelationTable};
pub use config::GatewayConfig;
pub use event::{ApiResponse, Event, EventKind};
pub use lifecycle::Shutdown;
pub use permission::{PermissionLevel, PermissionResolver};
pub use routing::{handler, MatchKind, RegistryError, Router, RouterBuilder};
pub use session::Session;
pub use tasks::HandlerPool;

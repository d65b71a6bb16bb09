//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing log events (structured fields: self_id, user_id, echo)
//!     → metrics.rs (frame and dispatch counters)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Metrics are cheap (atomic increments) and safe to record off the
//!   hot path even when no exporter is installed

pub mod metrics;

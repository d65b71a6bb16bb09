//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Stop triggered → broadcast wake → workers re-check and exit → join
//! ```
//!
//! # Design Decisions
//! - Cooperative shutdown: workers observe the signal at their next wake
//! - Teardown is complete only once every worker task has been joined

pub mod shutdown;

pub use shutdown::Shutdown;

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (worker counts > 0, timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the deserialized config

use std::fmt;

use crate::config::schema::GatewayConfig;

/// One semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub problem: &'static str,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

/// Check the ranges serde cannot express.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.pipeline.process_workers == 0 {
        errors.push(ValidationError {
            field: "pipeline.process_workers",
            problem: "must be at least 1",
        });
    }
    if config.pipeline.writer_workers == 0 {
        errors.push(ValidationError {
            field: "pipeline.writer_workers",
            problem: "must be at least 1",
        });
    }
    if config.pipeline.handler_pool == 0 {
        errors.push(ValidationError {
            field: "pipeline.handler_pool",
            problem: "must be at least 1",
        });
    }
    if config.api.call_timeout_secs == 0 {
        errors.push(ValidationError {
            field: "api.call_timeout_secs",
            problem: "must be at least 1",
        });
    }
    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address",
            problem: "not a valid socket address",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

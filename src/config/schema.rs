//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from config
//! files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address for the gateway connection).
    pub listener: ListenerConfig,

    /// Worker pool sizing for the ingestion pipeline.
    pub pipeline: PipelineConfig,

    /// Outbound API call settings.
    pub api: ApiConfig,

    /// Static permission lists.
    pub permission: PermissionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address the event gateway connects to (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Worker pool sizes for one session's pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Process workers parsing and classifying inbound frames.
    pub process_workers: usize,

    /// Writer workers draining the outbound queue.
    pub writer_workers: usize,

    /// Concurrency cap of the handler execution pool.
    pub handler_pool: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            process_workers: 4,
            writer_workers: 4,
            handler_pool: 16,
        }
    }
}

/// Outbound API call settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bounded wait applied by [`crate::api::ApiHandle::call`], in seconds.
    /// Expiry means unknown outcome, not failure.
    pub call_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Static permission lists consumed by the default resolver.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PermissionConfig {
    /// Senders resolved at the highest level.
    pub superusers: Vec<i64>,

    /// Senders resolved at the white-list level.
    pub whitelist: Vec<i64>,

    /// Senders resolved at the lowest level.
    pub blacklist: Vec<i64>,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics exporter.
    pub metrics_enabled: bool,

    /// Address the metrics exporter listens on.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.pipeline.process_workers, 4);
        assert_eq!(config.api.call_timeout_secs, 30);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn partial_sections_deserialize() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [pipeline]
            process_workers = 2

            [permission]
            superusers = [1001]
            "#,
        )
        .unwrap();
        assert_eq!(config.pipeline.process_workers, 2);
        // Unset fields in a present section still default.
        assert_eq!(config.pipeline.writer_workers, 4);
        assert_eq!(config.permission.superusers, vec![1001]);
    }
}

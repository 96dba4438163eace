//! # Configuration Management
//!
//! Engine-level settings for the orchestration core: concurrency caps,
//! default timeouts, trace channel capacity and the flows directory used by
//! file-based deployment endpoints. Values come from an optional config
//! file overlaid with `FLOWBRIDGE_`-prefixed environment variables.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, FlowBridgeError, Result};

/// Engine configuration for the flow orchestration core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowBridgeConfig {
    /// Maximum number of parallel target executions spawned per tier
    pub max_parallel_targets: usize,
    /// Default per-target timeout applied when a target does not set one
    pub default_timeout_ms: u64,
    /// Capacity of the trace event broadcast channel
    pub trace_channel_capacity: usize,
    /// Directory under which file-based deployment endpoints are derived
    pub flows_directory: String,
    /// Base URL prepended to generated API-docs links in deployment metadata
    pub api_docs_base_url: String,
}

impl Default for FlowBridgeConfig {
    fn default() -> Self {
        Self {
            max_parallel_targets: 16,
            default_timeout_ms: 30_000,
            trace_channel_capacity: 1000,
            flows_directory: "/var/flowbridge/flows".to_string(),
            api_docs_base_url: "/api-docs".to_string(),
        }
    }
}

impl FlowBridgeConfig {
    /// Load configuration from an optional file plus environment overrides.
    ///
    /// Environment variables use the `FLOWBRIDGE_` prefix, e.g.
    /// `FLOWBRIDGE_MAX_PARALLEL_TARGETS=32`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(Environment::with_prefix("FLOWBRIDGE"))
            .build()
            .map_err(|e| config_error(e.to_string()))?;

        // Missing keys fall back to defaults via #[serde(default)].
        settings
            .try_deserialize::<FlowBridgeConfig>()
            .map_err(|e| config_error(e.to_string()))
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }
}

fn config_error(reason: String) -> FlowBridgeError {
    ConfigurationError::InvalidEngineConfig { reason }.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FlowBridgeConfig::default();
        assert_eq!(config.max_parallel_targets, 16);
        assert_eq!(config.default_timeout_ms, 30_000);
        assert_eq!(config.trace_channel_capacity, 1000);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = FlowBridgeConfig::load(None).expect("load should succeed");
        assert_eq!(
            config.flows_directory,
            FlowBridgeConfig::default().flows_directory
        );
    }
}

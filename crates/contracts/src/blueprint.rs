//! RoutingBlueprint - Config Loader output
//!
//! Describes both destinations and the shared flush policy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete routing configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoutingBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Destination receiving error events
    #[validate(nested)]
    pub primary: DestinationConfig,

    /// Destination receiving everything else
    #[validate(nested)]
    pub secondary: SecondaryConfig,

    /// Flush policy applied to both destinations
    #[serde(default)]
    #[validate(nested)]
    pub flush: FlushConfig,
}

/// A destination with a known address
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DestinationConfig {
    /// Destination address
    #[validate(length(min = 1, message = "dsn cannot be empty"))]
    pub dsn: String,

    /// Backend settings
    #[serde(flatten)]
    #[validate(nested)]
    pub sink: SinkConfig,
}

/// Secondary destination whose address may come from fallback sources
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SecondaryConfig {
    /// Explicit address; wins over every fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,

    /// Environment variables checked in order when `dsn` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_env: Option<Vec<String>>,

    /// Backend settings
    #[serde(flatten)]
    #[validate(nested)]
    pub sink: SinkConfig,
}

/// Destination backend settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink type
    #[serde(default)]
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, max = 100_000))]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl SinkConfig {
    /// Settings of the given type with default capacity and no parameters
    pub fn of_type(sink_type: SinkType) -> Self {
        Self {
            sink_type,
            queue_capacity: default_queue_capacity(),
            params: HashMap::new(),
        }
    }
}

/// Flush policy
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FlushConfig {
    /// Per-destination flush timeout in milliseconds
    #[serde(default = "default_flush_timeout_ms")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,
}

impl FlushConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_flush_timeout_ms(),
        }
    }
}

fn default_queue_capacity() -> usize {
    100
}

fn default_flush_timeout_ms() -> u64 {
    2000
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    #[default]
    Log,
    /// JSON lines file per project
    File,
    /// UDP datagrams to the DSN host
    Network,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn destination(dsn: &str, queue_capacity: usize) -> DestinationConfig {
        DestinationConfig {
            dsn: dsn.to_string(),
            sink: SinkConfig {
                queue_capacity,
                ..SinkConfig::of_type(SinkType::Log)
            },
        }
    }

    #[test]
    fn test_sink_config_defaults() {
        let sink = SinkConfig::of_type(SinkType::File);
        assert_eq!(sink.queue_capacity, 100);
        assert!(sink.params.is_empty());
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        assert!(destination("https://k@host/1", 0).validate().is_err());
        assert!(destination("", 10).validate().is_err());
        assert!(destination("https://k@host/1", 10).validate().is_ok());
    }

    #[test]
    fn test_flush_default() {
        let flush = FlushConfig::default();
        assert_eq!(flush.timeout(), Duration::from_millis(2000));
    }
}

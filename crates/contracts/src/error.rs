//! Layered error definitions
//!
//! Categorized by source: config / delivery / lifecycle / fan-out

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Secondary destination could not be resolved from any source
    #[error("{}", describe_unresolved(.parameter, .fallbacks))]
    UnresolvedDestination {
        parameter: String,
        fallbacks: Option<Vec<String>>,
    },

    /// Malformed destination address
    #[error("invalid dsn '{dsn}': {reason}")]
    InvalidDsn { dsn: String, reason: String },

    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Delivery Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    /// Destination queue is full, envelope dropped
    #[error("queue full for destination '{destination}', envelope dropped")]
    QueueFull { destination: String },

    /// Flush did not complete in time
    #[error("flush of destination '{destination}' timed out after {timeout_ms}ms")]
    FlushTimeout { destination: String, timeout_ms: u64 },

    // ===== Lifecycle Errors =====
    /// Destination already shut down
    #[error("destination '{destination}' is closed")]
    TransportClosed { destination: String },

    // ===== Fan-out Errors =====
    /// A non-primary destination failed while the primary succeeded
    #[error("{operation} failed on destination '{destination}': {source}")]
    DestinationFailed {
        destination: String,
        operation: String,
        #[source]
        source: Box<ContractError>,
    },

    /// Both destinations failed
    #[error("{operation} failed on both destinations: primary: {primary}; secondary: {secondary}")]
    Fanout {
        operation: String,
        #[source]
        primary: Box<ContractError>,
        secondary: Box<ContractError>,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

fn describe_unresolved(parameter: &str, fallbacks: &Option<Vec<String>>) -> String {
    match fallbacks {
        Some(names) if !names.is_empty() => format!(
            "secondary destination unresolved: parameter \"{parameter}\" is undefined and fallback sources {} are all undefined",
            names
                .iter()
                .map(|n| format!("\"{n}\""))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        _ => format!(
            "secondary destination unresolved: parameter \"{parameter}\" is undefined and no fallback sources were supplied"
        ),
    }
}

impl ContractError {
    /// Create unresolved destination error
    pub fn unresolved_destination(
        parameter: impl Into<String>,
        fallbacks: Option<Vec<String>>,
    ) -> Self {
        Self::UnresolvedDestination {
            parameter: parameter.into(),
            fallbacks,
        }
    }

    /// Create invalid DSN error
    pub fn invalid_dsn(dsn: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDsn {
            dsn: dsn.into(),
            reason: reason.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create transport closed error
    pub fn transport_closed(destination: impl Into<String>) -> Self {
        Self::TransportClosed {
            destination: destination.into(),
        }
    }

    /// Whether this error belongs to the configuration family
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedDestination { .. }
                | Self::InvalidDsn { .. }
                | Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_message_lists_fallbacks_in_order() {
        let err = ContractError::unresolved_destination(
            "secondary.dsn",
            Some(vec!["SENTRY_PERFORMANCE_DSN".into(), "SENTRY_DSN".into()]),
        );
        let message = err.to_string();
        assert!(message.contains("\"secondary.dsn\""));
        let perf = message.find("SENTRY_PERFORMANCE_DSN").unwrap();
        let prod = message.find("\"SENTRY_DSN\"").unwrap();
        assert!(perf < prod);
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unresolved_message_without_fallbacks() {
        let err = ContractError::unresolved_destination("secondary.dsn", None);
        assert!(err.to_string().contains("no fallback sources were supplied"));
    }

    #[test]
    fn test_fanout_source_is_primary() {
        use std::error::Error as _;

        let err = ContractError::Fanout {
            operation: "flush".into(),
            primary: Box::new(ContractError::Other("primary down".into())),
            secondary: Box::new(ContractError::Other("secondary down".into())),
        };
        assert_eq!(err.source().unwrap().to_string(), "primary down");
        assert!(err.to_string().contains("secondary down"));
    }
}

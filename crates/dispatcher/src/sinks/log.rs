//! LogSink - logs envelope summaries via tracing

use contracts::{ContractError, Dsn, Envelope, EnvelopeSink};
use tracing::{info, instrument};

/// Sink that logs envelope summaries for debugging
pub struct LogSink {
    name: String,
    project_id: String,
}

impl LogSink {
    /// Create a new LogSink for the given destination
    pub fn new(name: impl Into<String>, dsn: &Dsn) -> Self {
        Self {
            name: name.into(),
            project_id: dsn.project_id().to_string(),
        }
    }

    fn log_envelope_summary(&self, envelope: &Envelope) {
        info!(
            sink = %self.name,
            project_id = %self.project_id,
            event_id = envelope.headers.event_id.as_deref().unwrap_or("-"),
            items = ?envelope.item_types(),
            classification = %envelope.classification(),
            "Envelope received"
        );
    }
}

impl EnvelopeSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, envelope),
        fields(sink = %self.name)
    )]
    async fn write(&mut self, envelope: &Envelope) -> Result<(), ContractError> {
        self.log_envelope_summary(envelope);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Item;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_sink_write() {
        let dsn = Dsn::parse("https://key@host/5").unwrap();
        let mut sink = LogSink::new("test_log", &dsn);
        let envelope = Envelope::new(vec![Item::event(json!({"type": "error"}))]);

        assert!(sink.write(&envelope).await.is_ok());
        assert!(sink.flush().await.is_ok());
        assert_eq!(sink.name(), "test_log");
    }
}

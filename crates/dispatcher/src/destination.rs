//! Destination factory - sink selection by configured type

use contracts::{Dsn, SinkConfig, SinkType};
use tracing::{info, instrument};

use crate::error::DispatcherError;
use crate::handle::TransportHandle;
use crate::sinks::{FileSink, LogSink, NetworkSink};

/// Create a running TransportHandle for one destination
#[instrument(
    name = "dispatcher_create_destination",
    skip(config, dsn),
    fields(sink_type = ?config.sink_type, project_id = %dsn.project_id())
)]
pub async fn create_destination(
    name: &str,
    config: &SinkConfig,
    dsn: Dsn,
) -> Result<TransportHandle, DispatcherError> {
    let handle = match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(name, &dsn);
            TransportHandle::spawn(name, dsn, sink, config.queue_capacity)
        }
        SinkType::File => {
            let sink = FileSink::from_params(name, &dsn, &config.params)
                .map_err(|e| DispatcherError::sink_creation(name, e.to_string()))?;
            TransportHandle::spawn(name, dsn, sink, config.queue_capacity)
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(name, &dsn, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(name, e.to_string()))?;
            TransportHandle::spawn(name, dsn, sink, config.queue_capacity)
        }
    };

    info!(destination = name, dsn = %handle.dsn(), "Destination ready");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Transport;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_file_destination() {
        let dir = tempdir().unwrap();
        let mut config = SinkConfig::of_type(SinkType::File);
        config
            .params
            .insert("base_path".into(), dir.path().display().to_string());
        let dsn = Dsn::parse("https://key@host/11").unwrap();

        let mut handle = create_destination("primary", &config, dsn).await.unwrap();
        assert_eq!(handle.name(), "primary");
        handle.flush(Duration::from_secs(1)).await.unwrap();
        handle.shutdown().await.unwrap();

        assert!(dir.path().join("11.jsonl").exists());
    }

    #[tokio::test]
    async fn test_network_destination_without_port_fails() {
        let config = SinkConfig::of_type(SinkType::Network);
        let dsn = Dsn::parse("udp://key@127.0.0.1/11").unwrap();

        let err = create_destination("secondary", &config, dsn)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DispatcherError::SinkCreation { .. }));
    }
}

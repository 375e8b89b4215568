//! NetworkSink - UDP fire-and-forget delivery to the DSN host

use contracts::{ContractError, Dsn, Envelope, EnvelopeSink};
use std::collections::HashMap;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Serialization format for network transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Target `host:port`
    pub addr: String,
    /// Serialization format
    pub format: NetworkFormat,
    /// Datagrams above this size are not sent
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    /// Create config from the destination address and params map
    pub fn from_params(dsn: &Dsn, params: &HashMap<String, String>) -> Result<Self, String> {
        let addr = dsn
            .socket_addr()
            .ok_or_else(|| format!("dsn '{dsn}' has no port"))?;

        let format = match params.get("format").map(String::as_str) {
            Some("bincode") => NetworkFormat::Bincode,
            Some("json") | None => NetworkFormat::Json,
            Some(other) => return Err(format!("unknown format '{other}'")),
        };

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Sink that sends envelopes over UDP
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: Option<UdpSocket>,
}

impl NetworkSink {
    /// Create a new NetworkSink
    #[instrument(name = "network_sink_new", skip(name, config))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        // Bind to any available port
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&config.addr).await?;

        debug!(
            sink = %name,
            target = %config.addr,
            "NetworkSink connected"
        );

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "network_sink_from_params", skip(name, dsn, params))]
    pub async fn from_params(
        name: impl Into<String>,
        dsn: &Dsn,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(dsn, params).map_err(|e| {
            ContractError::SinkConnection {
                sink_name: name.clone(),
                message: e,
            }
        })?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name: name,
                message: e.to_string(),
            })
    }

    fn serialize_envelope(&self, envelope: &Envelope) -> Result<Vec<u8>, String> {
        match self.config.format {
            NetworkFormat::Json => {
                serde_json::to_vec(envelope).map_err(|e| format!("json error: {e}"))
            }
            NetworkFormat::Bincode => {
                bincode::serialize(envelope).map_err(|e| format!("bincode error: {e}"))
            }
        }
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_write(&self.name, "socket not connected"))
    }

    fn prepare_payload(&self, envelope: &Envelope) -> Result<Vec<u8>, ContractError> {
        let data = self
            .serialize_envelope(envelope)
            .map_err(|e| ContractError::sink_write(&self.name, e))?;

        if data.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Envelope too large for one datagram"
            );
            return Err(ContractError::sink_write(
                &self.name,
                format!(
                    "envelope of {} bytes exceeds max_packet_size {}",
                    data.len(),
                    self.config.max_packet_size
                ),
            ));
        }

        Ok(data)
    }

    async fn transmit(&self, socket: &UdpSocket, data: &[u8]) {
        match socket.send(data).await {
            Ok(sent) => {
                debug!(sink = %self.name, bytes = sent, "Sent");
            }
            Err(e) => {
                // Log but don't fail - UDP is best-effort
                error!(sink = %self.name, error = %e, "UDP send failed");
            }
        }
    }
}

impl EnvelopeSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_write",
        skip(self, envelope),
        fields(sink = %self.name, target = %self.config.addr)
    )]
    async fn write(&mut self, envelope: &Envelope) -> Result<(), ContractError> {
        let socket = self.socket()?;
        let data = self.prepare_payload(envelope)?;
        self.transmit(socket, &data).await;
        Ok(())
    }

    #[instrument(name = "network_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // UDP doesn't buffer
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }
}

//! TransportHandle - one destination with an isolated queue and worker task

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{ContractError, Dsn, Envelope, EnvelopeSink, Transport};

use crate::metrics::DestinationMetrics;

/// Work items processed in order by the worker
enum Command {
    Deliver(Envelope),
    Flush(oneshot::Sender<Result<(), ContractError>>),
}

/// Handle to a running destination worker
pub struct TransportHandle {
    /// Destination name
    name: String,
    /// Destination address
    dsn: Dsn,
    /// Channel to the worker; `None` once shut down
    tx: Option<mpsc::Sender<Command>>,
    /// Shared metrics
    metrics: Arc<DestinationMetrics>,
    /// Worker task handle; `None` once joined
    worker_handle: Option<JoinHandle<()>>,
}

impl TransportHandle {
    /// Create a new TransportHandle and spawn the worker task
    pub fn spawn<S: EnvelopeSink + Send + 'static>(
        name: impl Into<String>,
        dsn: Dsn,
        sink: S,
        queue_capacity: usize,
    ) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(DestinationMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            destination_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            dsn,
            tx: Some(tx),
            metrics,
            worker_handle: Some(worker_handle),
        }
    }

    pub fn dsn(&self) -> &Dsn {
        &self.dsn
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<DestinationMetrics> {
        &self.metrics
    }

    /// Whether `shutdown` has run
    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    fn sender(&self) -> Result<&mpsc::Sender<Command>, ContractError> {
        self.tx
            .as_ref()
            .ok_or_else(|| ContractError::transport_closed(&self.name))
    }
}

impl Transport for TransportHandle {
    fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue without waiting; a full queue rejects the envelope
    async fn send(&mut self, envelope: Envelope) -> Result<(), ContractError> {
        let tx = self.sender()?;
        match tx.try_send(Command::Deliver(envelope)) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(tx.max_capacity() - tx.capacity());
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.inc_dropped_count();
                warn!(destination = %self.name, "Queue full, envelope dropped");
                Err(ContractError::QueueFull {
                    destination: self.name.clone(),
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(destination = %self.name, "Destination worker closed unexpectedly");
                Err(ContractError::transport_closed(&self.name))
            }
        }
    }

    /// Wait until every envelope queued before this call reached the sink
    #[instrument(
        name = "transport_handle_flush",
        skip(self),
        fields(destination = %self.name)
    )]
    async fn flush(&mut self, timeout: Duration) -> Result<(), ContractError> {
        let tx = self.sender()?;
        let name = &self.name;

        let flushed = tokio::time::timeout(timeout, async {
            let (reply_tx, reply_rx) = oneshot::channel();
            tx.send(Command::Flush(reply_tx))
                .await
                .map_err(|_| ContractError::transport_closed(name))?;
            reply_rx
                .await
                .map_err(|_| ContractError::transport_closed(name))?
        })
        .await;

        match flushed {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(timeout_ms, "Flush timed out");
                Err(ContractError::FlushTimeout {
                    destination: self.name.clone(),
                    timeout_ms,
                })
            }
        }
    }

    /// Drain the queue, flush and close the sink
    #[instrument(
        name = "transport_handle_shutdown",
        skip(self),
        fields(destination = %self.name)
    )]
    async fn shutdown(&mut self) -> Result<(), ContractError> {
        // Drop sender to signal worker to stop
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        drop(tx);

        if let Some(worker) = self.worker_handle.take() {
            if let Err(e) = worker.await {
                error!(error = ?e, "Worker task panicked");
                return Err(ContractError::Other(format!(
                    "worker for destination '{}' panicked: {e}",
                    self.name
                )));
            }
        }
        debug!("TransportHandle shutdown complete");
        Ok(())
    }
}

/// Worker task that consumes commands and drives the sink
#[instrument(
    name = "destination_worker_loop",
    skip(sink, rx, metrics),
    fields(destination = %name)
)]
async fn destination_worker<S: EnvelopeSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<Command>,
    metrics: Arc<DestinationMetrics>,
    name: String,
) {
    debug!(sink = sink.name(), "Destination worker started");

    while let Some(command) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match command {
            Command::Deliver(envelope) => match sink.write(&envelope).await {
                Ok(()) => metrics.inc_sent_count(),
                Err(e) => {
                    metrics.inc_failure_count();
                    error!(
                        event_id = envelope.headers.event_id.as_deref().unwrap_or("-"),
                        error = %e,
                        "Write failed"
                    );
                    // Keep going
                }
            },
            Command::Flush(reply) => {
                let result = sink.flush().await;
                if result.is_ok() {
                    metrics.inc_flush_count();
                }
                // The caller may have timed out and gone away
                let _ = reply.send(result);
            }
        }
    }

    // Cleanup
    if let Err(e) = sink.flush().await {
        error!(error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(error = %e, "Close failed on shutdown");
    }

    debug!("Destination worker stopped");
}

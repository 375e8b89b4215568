//! RoutingTransport - sends each envelope to exactly one of two destinations
//!
//! Envelopes whose primary event is an error go to the primary destination.
//! Everything else (transactions, sessions, unclassified batches) goes to
//! the secondary destination. Flush and shutdown fan out to both.

use std::future::Future;
use std::time::Duration;

use contracts::{ContractError, Dsn, Envelope, EventClassification, RoutingBlueprint, Transport};
use tracing::{debug, error, info, instrument};

use crate::destination::create_destination;
use crate::error::DispatcherError;
use crate::handle::TransportHandle;
use crate::resolver::{DestinationResolver, FallbackSource};

/// Name of the destination receiving error events
pub const PRIMARY_DESTINATION: &str = "primary";

/// Name of the destination receiving everything else
pub const SECONDARY_DESTINATION: &str = "secondary";

/// Counter incremented once per routed envelope
pub const ENVELOPES_ROUTED_METRIC: &str = "telemetry_splitter_envelopes_routed_total";

/// Flush timeout used by `flush_default` unless configured otherwise
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_millis(2000);

/// Destination chosen for an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Primary,
    Secondary,
}

impl Route {
    /// Only error events take the primary route
    pub fn for_classification(classification: &EventClassification) -> Self {
        if classification.is_error() {
            Self::Primary
        } else {
            Self::Secondary
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => PRIMARY_DESTINATION,
            Self::Secondary => SECONDARY_DESTINATION,
        }
    }
}

/// Classify an envelope by its primary event
pub fn classify(envelope: &Envelope) -> EventClassification {
    envelope.classification()
}

/// Classification and the route it implies
pub fn route_for(envelope: &Envelope) -> (Route, EventClassification) {
    let classification = classify(envelope);
    (Route::for_classification(&classification), classification)
}

/// Bounded label set for metrics
fn classification_label(classification: &EventClassification) -> &'static str {
    match classification {
        EventClassification::Error => "error",
        EventClassification::Other(_) => "other",
        EventClassification::Unclassified => "unclassified",
    }
}

/// RoutingTransport lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    Active,
    ShuttingDown,
    Closed,
}

/// Per-route delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingStats {
    /// Envelopes accepted by the primary destination
    pub primary: u64,
    /// Envelopes accepted by the secondary destination
    pub secondary: u64,
    /// Envelopes the chosen destination rejected
    pub rejected: u64,
}

impl RoutingStats {
    pub fn total(&self) -> u64 {
        self.primary + self.secondary + self.rejected
    }
}

/// Transport that owns two destinations and picks one per envelope
pub struct RoutingTransport<P, S> {
    primary: P,
    secondary: S,
    state: LifecycleState,
    flush_timeout: Duration,
    stats: RoutingStats,
}

impl<P: Transport, S: Transport> RoutingTransport<P, S> {
    /// Assemble from two ready destinations
    pub fn with_destinations(primary: P, secondary: S) -> Self {
        let mut transport = Self {
            primary,
            secondary,
            state: LifecycleState::Constructed,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            stats: RoutingStats::default(),
        };
        transport.activate();
        transport
    }

    /// Resolve the secondary address, then build the secondary destination.
    ///
    /// `make_secondary` is only called once an address has been resolved and
    /// parsed; resolver errors are returned unchanged.
    pub async fn connect<F, Fut, E>(
        primary: P,
        explicit: Option<&str>,
        fallbacks: Option<&[FallbackSource]>,
        make_secondary: F,
    ) -> Result<Self, E>
    where
        F: FnOnce(Dsn) -> Fut,
        Fut: Future<Output = Result<S, E>>,
        E: From<ContractError>,
    {
        let (dsn, source) = DestinationResolver::default().resolve_dsn(explicit, fallbacks)?;
        info!(secondary = %dsn, source = %source, "Secondary destination resolved");

        let secondary = make_secondary(dsn).await?;
        Ok(Self::with_destinations(primary, secondary))
    }

    /// Default timeout for `flush_default`
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    fn activate(&mut self) {
        self.state = LifecycleState::Active;
        info!(
            primary = self.primary.name(),
            secondary = self.secondary.name(),
            "Routing transport active"
        );
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn secondary(&self) -> &S {
        &self.secondary
    }

    pub fn stats(&self) -> RoutingStats {
        self.stats
    }

    pub fn flush_timeout(&self) -> Duration {
        self.flush_timeout
    }

    /// Flush both destinations with the configured timeout
    pub async fn flush_default(&mut self) -> Result<(), ContractError> {
        let timeout = self.flush_timeout;
        self.flush(timeout).await
    }

    /// Immediate teardown; same fan-out as `shutdown`
    pub async fn kill(&mut self) -> Result<(), ContractError> {
        self.shutdown().await
    }

    /// Merge per-destination outcomes. The primary's error is authoritative.
    fn combine(
        &self,
        operation: &str,
        primary: Result<(), ContractError>,
        secondary: Result<(), ContractError>,
    ) -> Result<(), ContractError> {
        match (primary, secondary) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(primary), Ok(())) => Err(primary),
            (Ok(()), Err(secondary)) => Err(ContractError::DestinationFailed {
                destination: self.secondary.name().to_string(),
                operation: operation.to_string(),
                source: Box::new(secondary),
            }),
            (Err(primary), Err(secondary)) => Err(ContractError::Fanout {
                operation: operation.to_string(),
                primary: Box::new(primary),
                secondary: Box::new(secondary),
            }),
        }
    }
}

impl RoutingTransport<TransportHandle, TransportHandle> {
    /// Build both destinations from configuration.
    ///
    /// Both addresses are resolved before any sink is created, so a failed
    /// resolution leaves no files, sockets or workers behind.
    #[instrument(name = "routing_from_blueprint", skip(blueprint, fallbacks))]
    pub async fn from_blueprint(
        blueprint: &RoutingBlueprint,
        fallbacks: Option<&[FallbackSource]>,
    ) -> Result<Self, DispatcherError> {
        let primary_dsn = Dsn::parse(&blueprint.primary.dsn)?;
        let (secondary_dsn, source) = DestinationResolver::default()
            .resolve_dsn(blueprint.secondary.dsn.as_deref(), fallbacks)?;
        info!(secondary = %secondary_dsn, source = %source, "Secondary destination resolved");

        let primary =
            create_destination(PRIMARY_DESTINATION, &blueprint.primary.sink, primary_dsn).await?;
        let secondary = match create_destination(
            SECONDARY_DESTINATION,
            &blueprint.secondary.sink,
            secondary_dsn,
        )
        .await
        {
            Ok(secondary) => secondary,
            Err(e) => {
                let mut primary = primary;
                if let Err(close_err) = primary.shutdown().await {
                    error!(error = %close_err, "Primary shutdown after failed setup");
                }
                return Err(e);
            }
        };

        Ok(Self::with_destinations(primary, secondary).with_flush_timeout(blueprint.flush.timeout()))
    }
}

/// Bound one destination's operation by `timeout`
async fn bounded<F>(destination: &str, timeout: Duration, op: F) -> Result<(), ContractError>
where
    F: Future<Output = Result<(), ContractError>>,
{
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => result,
        Err(_) => Err(ContractError::FlushTimeout {
            destination: destination.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

impl<P: Transport, S: Transport> Transport for RoutingTransport<P, S> {
    fn name(&self) -> &str {
        "routing"
    }

    /// Deliver to the one destination chosen by classification.
    /// Errors from that destination are returned untouched.
    async fn send(&mut self, envelope: Envelope) -> Result<(), ContractError> {
        let (route, classification) = route_for(&envelope);
        debug!(
            route = route.as_str(),
            classification = %classification,
            items = ?envelope.item_types(),
            "Routing envelope"
        );
        metrics::counter!(
            ENVELOPES_ROUTED_METRIC,
            "route" => route.as_str(),
            "classification" => classification_label(&classification)
        )
        .increment(1);

        let result = match route {
            Route::Primary => self.primary.send(envelope).await,
            Route::Secondary => self.secondary.send(envelope).await,
        };

        match (&result, route) {
            (Ok(()), Route::Primary) => self.stats.primary += 1,
            (Ok(()), Route::Secondary) => self.stats.secondary += 1,
            (Err(_), _) => self.stats.rejected += 1,
        }
        result
    }

    /// Flush both destinations concurrently, secondary polled first
    #[instrument(name = "routing_flush", skip(self), fields(state = ?self.state))]
    async fn flush(&mut self, timeout: Duration) -> Result<(), ContractError> {
        if self.state == LifecycleState::Closed {
            debug!("Flush after close ignored");
            return Ok(());
        }

        let secondary_name = self.secondary.name().to_string();
        let primary_name = self.primary.name().to_string();
        let (secondary, primary) = tokio::join!(
            bounded(&secondary_name, timeout, self.secondary.flush(timeout)),
            bounded(&primary_name, timeout, self.primary.flush(timeout)),
        );

        if let Err(e) = &secondary {
            error!(destination = %secondary_name, error = %e, "Secondary flush failed");
        }
        self.combine("flush", primary, secondary)
    }

    /// Shut down secondary then primary; a no-op once closed
    #[instrument(name = "routing_shutdown", skip(self), fields(state = ?self.state))]
    async fn shutdown(&mut self) -> Result<(), ContractError> {
        if self.state == LifecycleState::Closed {
            debug!("Already closed");
            return Ok(());
        }
        self.state = LifecycleState::ShuttingDown;

        let secondary = self.secondary.shutdown().await;
        if let Err(e) = &secondary {
            error!(destination = self.secondary.name(), error = %e, "Secondary shutdown failed");
        }
        let primary = self.primary.shutdown().await;

        self.state = LifecycleState::Closed;
        info!(
            primary = self.stats.primary,
            secondary = self.stats.secondary,
            rejected = self.stats.rejected,
            "Routing transport closed"
        );
        self.combine("shutdown", primary, secondary)
    }
}

//! Transport trait - the operations every destination supports
//!
//! The routing transport implements this trait itself, so callers use the
//! same three operations whichever destination handles an envelope.

use std::time::Duration;

use crate::{ContractError, Envelope};

/// Destination transport
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Accept one envelope for eventual delivery
    async fn send(&mut self, envelope: Envelope) -> Result<(), ContractError>;

    /// Block until pending envelopes are delivered or `timeout` elapses
    async fn flush(&mut self, timeout: Duration) -> Result<(), ContractError>;

    /// Release resources. Calling it again after success must not fail.
    async fn shutdown(&mut self) -> Result<(), ContractError>;
}

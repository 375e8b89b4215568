//! EnvelopeSink trait - destination backend interface
//!
//! A sink is the delivery backend driven by a destination's worker task.

use crate::{ContractError, Envelope};

/// Envelope output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(EnvelopeSink: Send)]
pub trait LocalEnvelopeSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one envelope
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, envelope: &Envelope) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}

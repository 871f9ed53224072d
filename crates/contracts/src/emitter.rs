//! Emitter trait - downstream transport interface
//!
//! The only extension point for adding a new destination.

use crate::{ContractError, Metric};

/// Delivers one batch downstream.
///
/// Called concurrently from detached dispatch tasks, hence `&self`.
#[trait_variant::make(Emitter: Send)]
pub trait LocalEmitter {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Emit one batch
    ///
    /// # Errors
    /// Any error marks the whole batch as dropped; the core does not retry.
    async fn emit(&self, batch: &[Metric]) -> Result<(), ContractError>;
}

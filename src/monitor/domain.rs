use crate::shared::types::PresaleState;
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Source of presale state observations, polled by the controller on its
/// monitor interval. Restartable: a transient read failure leaves no state
/// behind beyond the backoff counter.
#[async_trait]
pub trait Monitor: Send + Sync {
    /// Classify the current presale phase from chain reads. Transient read
    /// failures are swallowed and reported as `Unknown`; only Permanent
    /// failures return an error.
    async fn observe(&mut self) -> Result<PresaleState>;

    /// Extra delay to add to the next poll after transient read failures.
    fn backoff(&self) -> Duration;
}

use crate::record::OutcomeRecord;
use async_trait::async_trait;
use speechflow_core::DestinationError;

/// Persists the outcome of a buffered session to an external location.
///
/// Writers are registered per URI scheme in a
/// [`WriterRegistry`](crate::WriterRegistry) and receive the full output URI.
#[async_trait]
pub trait OutcomeWriter: Send + Sync {
    /// The URI scheme this writer serves (e.g. `"file"`).
    fn name(&self) -> &str;
    /// Write one session outcome to `uri`.
    async fn write(&self, uri: &str, record: &OutcomeRecord) -> Result<(), DestinationError>;
}

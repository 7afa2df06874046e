use serde::{Deserialize, Serialize};
use speechflow_core::{NonStreamingRecognizeResponse, OperationMetadata};

/// What gets persisted for a buffered session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    pub metadata: OperationMetadata,
    pub response: NonStreamingRecognizeResponse,
}

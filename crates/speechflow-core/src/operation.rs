//! Metadata of asynchronous recognition jobs.
//!
//! Embedded messages are a closed set of tagged variants; each one serializes
//! with an `@type` discriminator next to its own fields.

use crate::types::SessionConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum EmbeddedMessage {
    InitialRecognizeRequest(SessionConfig),
    SessionRuntime(SessionRuntime),
}

/// Runtime counters of the session that produced an operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRuntime {
    pub session_id: String,
    pub chunks_received: u64,
    pub results_settled: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEvent {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    #[serde(default)]
    pub project_id: String,
    pub create_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<EmbeddedMessage>,
    #[serde(default)]
    pub events: Vec<OperationEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_metadata: Option<EmbeddedMessage>,
}

impl OperationMetadata {
    pub fn new(project_id: impl Into<String>, create_time: DateTime<Utc>) -> Self {
        Self {
            project_id: project_id.into(),
            create_time,
            end_time: None,
            request: None,
            events: Vec::new(),
            runtime_metadata: None,
        }
    }

    pub fn record_event(&mut self, description: impl Into<String>) {
        self.events.push(OperationEvent {
            description: description.into(),
        });
    }

    /// Stamps the end time. Later calls keep the first stamp.
    pub fn finish(&mut self, end_time: DateTime<Utc>) {
        if self.end_time.is_none() {
            self.end_time = Some(end_time);
        }
    }

    pub fn is_done(&self) -> bool {
        self.end_time.is_some()
    }
}

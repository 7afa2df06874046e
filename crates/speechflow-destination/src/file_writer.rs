use crate::record::OutcomeRecord;
use crate::registry::split_scheme;
use crate::writer_trait::OutcomeWriter;
use async_trait::async_trait;
use speechflow_core::DestinationError;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Writes outcomes as pretty-printed JSON to `file://<path>`.
pub struct FileWriter {
    write_count: AtomicUsize,
}

impl FileWriter {
    pub fn new() -> Self {
        Self {
            write_count: AtomicUsize::new(0),
        }
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::Relaxed)
    }
}

impl Default for FileWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutcomeWriter for FileWriter {
    fn name(&self) -> &str {
        "file"
    }

    async fn write(&self, uri: &str, record: &OutcomeRecord) -> Result<(), DestinationError> {
        let path = match split_scheme(uri) {
            Some(("file", path)) if !path.is_empty() => Path::new(path),
            _ => {
                return Err(DestinationError::WriteFailed(format!(
                    "not a file uri: {uri}"
                )))
            }
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DestinationError::WriteFailed(e.to_string()))?;
        }

        let body = serde_json::to_vec_pretty(record)
            .map_err(|e| DestinationError::WriteFailed(e.to_string()))?;
        tokio::fs::write(path, body)
            .await
            .map_err(|e| DestinationError::WriteFailed(e.to_string()))?;

        self.write_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(path = %path.display(), "session outcome written");
        Ok(())
    }
}

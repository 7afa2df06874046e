use crate::types::{Status, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("engine initialization failed: {0}")]
    InitializationFailed(String),

    #[error("engine processing failed: {0}")]
    ProcessingFailed(String),

    #[error("engine not found: {0}")]
    EngineNotFound(String),
}

/// Terminal failures of a recognition session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    #[error("session config may only be sent on the first request")]
    UnexpectedConfig,

    #[error("invalid audio chunk: {0}")]
    InvalidAudioChunk(String),

    #[error("invalid ledger update: {0}")]
    InvalidLedgerUpdate(String),

    #[error("illegal endpointer event sequence: {0}")]
    IllegalEventSequence(String),

    #[error("session cancelled")]
    SessionCancelled,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SessionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SessionError::InvalidConfig(_)
            | SessionError::UnexpectedConfig
            | SessionError::InvalidAudioChunk(_) => StatusCode::InvalidArgument,
            SessionError::InvalidLedgerUpdate(_)
            | SessionError::IllegalEventSequence(_)
            | SessionError::Engine(_) => StatusCode::Internal,
            SessionError::SessionCancelled => StatusCode::Cancelled,
        }
    }

    pub fn to_status(&self) -> Status {
        Status::new(self.status_code(), self.to_string())
    }
}

#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("destination initialization failed: {0}")]
    InitializationFailed(String),

    #[error("failed to write outcome: {0}")]
    WriteFailed(String),

    #[error("no destination registered for: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_invalid_argument() {
        let errors = [
            SessionError::InvalidConfig("x".to_string()),
            SessionError::UnexpectedConfig,
            SessionError::InvalidAudioChunk("x".to_string()),
        ];
        for e in errors {
            assert_eq!(e.status_code(), StatusCode::InvalidArgument);
        }
    }

    #[test]
    fn test_pipeline_errors_map_to_internal() {
        let errors = [
            SessionError::InvalidLedgerUpdate("x".to_string()),
            SessionError::IllegalEventSequence("x".to_string()),
            SessionError::Engine(EngineError::ProcessingFailed("x".to_string())),
        ];
        for e in errors {
            assert_eq!(e.status_code(), StatusCode::Internal);
        }
    }

    #[test]
    fn test_cancelled_status_carries_message() {
        let status = SessionError::SessionCancelled.to_status();
        assert!(status.is(StatusCode::Cancelled));
        assert_eq!(status.message, "session cancelled");
    }

    #[test]
    fn test_engine_error_converts() {
        let err: SessionError = EngineError::EngineNotFound("whisper".to_string()).into();
        assert_eq!(err.to_string(), "engine not found: whisper");
    }
}

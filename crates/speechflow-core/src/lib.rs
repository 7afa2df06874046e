pub mod config;
pub mod error;
pub mod operation;
pub mod types;

pub use config::AppConfig;
pub use error::{ConfigError, DestinationError, EngineError, SessionError};
pub use operation::{EmbeddedMessage, OperationEvent, OperationMetadata, SessionRuntime};
pub use types::{
    AudioChunk, AudioEncoding, AudioRequest, AudioSource, DeliveryMode, EndpointerEvent,
    NonStreamingRecognizeResponse, RecognitionAlternative, RecognitionResult, RecognizeRequest,
    RecognizeResponse, SessionConfig, SpeechContext, Status, StatusCode,
};

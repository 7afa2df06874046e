pub mod engine_trait;
pub mod host;
pub mod null_engine;
pub mod registry;

pub use engine_trait::RecognitionEngine;
pub use host::{SessionHandle, SessionHost};
pub use null_engine::NullEngine;
pub use registry::EngineRegistry;

use async_trait::async_trait;
use speechflow_core::{AudioChunk, EngineError, SessionConfig};
use speechflow_session::PipelineSignal;
use tokio::sync::mpsc;

/// The recognition pipeline behind a session.
///
/// One instance serves exactly one session. Audio arrives in order through
/// [`feed_audio`](Self::feed_audio); results and speech boundaries go back
/// through the signal sender, in the order they apply.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    fn name(&self) -> &str;
    async fn initialize(
        &mut self,
        settings: toml::Value,
        config: &SessionConfig,
    ) -> Result<(), EngineError>;
    async fn feed_audio(&self, chunk: AudioChunk) -> Result<(), EngineError>;
    /// No more audio will come. Flush pending results, then report the end of audio.
    async fn finish_audio(&self) -> Result<(), EngineError>;
    fn set_signal_sender(&mut self, sender: mpsc::UnboundedSender<PipelineSignal>);
    async fn shutdown(&self) -> Result<(), EngineError>;
}

use crate::engine_trait::RecognitionEngine;
use async_trait::async_trait;
use speechflow_core::{
    AudioChunk, AudioSource, EndpointerEvent, EngineError, RecognitionAlternative,
    RecognitionResult, SessionConfig,
};
use speechflow_session::PipelineSignal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct Utterance {
    speaking: bool,
    chunks: usize,
    bytes: usize,
    remote: usize,
    settled: usize,
}

/// A deterministic engine that describes the audio it was fed instead of
/// recognizing it.
///
/// Settings: `alternatives` (hypotheses per result, default 1) and
/// `final_after_chunks` (settle an utterance after that many chunks;
/// 0 settles only when audio ends).
pub struct NullEngine {
    alternatives: usize,
    final_after_chunks: usize,
    feed_count: AtomicUsize,
    utterance: Mutex<Utterance>,
    signal_sender: Option<mpsc::UnboundedSender<PipelineSignal>>,
}

impl NullEngine {
    pub fn new() -> Self {
        Self {
            alternatives: 1,
            final_after_chunks: 0,
            feed_count: AtomicUsize::new(0),
            utterance: Mutex::new(Utterance::default()),
            signal_sender: None,
        }
    }

    pub fn feed_count(&self) -> usize {
        self.feed_count.load(Ordering::Relaxed)
    }

    fn send(&self, signal: PipelineSignal) {
        if let Some(tx) = self.signal_sender.as_ref() {
            let _ = tx.send(signal);
        }
    }

    fn hypotheses(&self, u: &Utterance, settled: bool) -> Vec<RecognitionAlternative> {
        let text = format!(
            "[null] utterance {}: {} chunk(s), {} bytes, {} remote",
            u.settled + 1,
            u.chunks,
            u.bytes,
            u.remote
        );
        (0..self.alternatives)
            .map(|i| {
                let alt = if i == 0 {
                    RecognitionAlternative::new(text.clone())
                } else {
                    RecognitionAlternative::new(format!("{text} (alt {i})"))
                };
                if settled {
                    alt.with_confidence((0.9 - 0.1 * i as f32).max(0.1))
                } else {
                    alt
                }
            })
            .collect()
    }

    fn settle(&self, u: &mut Utterance) {
        self.send(PipelineSignal::Boundary(EndpointerEvent::EndOfSpeech));
        self.send(PipelineSignal::Update {
            result_index: u.settled,
            results: vec![RecognitionResult::settled(self.hypotheses(u, true))],
        });
        *u = Utterance {
            settled: u.settled + 1,
            ..Default::default()
        };
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Utterance>, EngineError> {
        self.utterance
            .lock()
            .map_err(|_| EngineError::ProcessingFailed("utterance state poisoned".to_string()))
    }
}

impl Default for NullEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn usize_setting(settings: &toml::Value, key: &str, default: usize) -> Result<usize, EngineError> {
    match settings.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_integer()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                EngineError::InitializationFailed(format!(
                    "'{key}' must be a non-negative integer"
                ))
            }),
    }
}

#[async_trait]
impl RecognitionEngine for NullEngine {
    fn name(&self) -> &str {
        "null"
    }

    async fn initialize(
        &mut self,
        settings: toml::Value,
        config: &SessionConfig,
    ) -> Result<(), EngineError> {
        self.alternatives = usize_setting(&settings, "alternatives", 1)?.max(1);
        self.final_after_chunks = usize_setting(&settings, "final_after_chunks", 0)?;
        tracing::debug!(
            alternatives = self.alternatives,
            final_after_chunks = self.final_after_chunks,
            sample_rate = config.sample_rate,
            "NullEngine initialized"
        );
        Ok(())
    }

    async fn feed_audio(&self, chunk: AudioChunk) -> Result<(), EngineError> {
        let count = self.feed_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut u = self.lock()?;

        if !u.speaking {
            u.speaking = true;
            self.send(PipelineSignal::Boundary(EndpointerEvent::StartOfSpeech));
        }
        u.chunks += 1;
        match &chunk.source {
            AudioSource::Inline(bytes) => u.bytes += bytes.len(),
            AudioSource::Uri(_) => u.remote += 1,
        }

        self.send(PipelineSignal::Update {
            result_index: u.settled,
            results: vec![RecognitionResult::interim(
                self.hypotheses(&u, false),
                Some(0.5),
            )],
        });
        if self.final_after_chunks > 0 && u.chunks >= self.final_after_chunks {
            self.settle(&mut u);
        }
        tracing::trace!("NullEngine fed chunk #{count} (sequence {})", chunk.sequence);
        Ok(())
    }

    async fn finish_audio(&self) -> Result<(), EngineError> {
        let mut u = self.lock()?;
        if u.speaking {
            self.settle(&mut u);
        }
        self.send(PipelineSignal::Boundary(EndpointerEvent::EndOfAudio));
        Ok(())
    }

    fn set_signal_sender(&mut self, sender: mpsc::UnboundedSender<PipelineSignal>) {
        self.signal_sender = Some(sender);
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

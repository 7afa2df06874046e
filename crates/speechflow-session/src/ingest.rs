use speechflow_core::{AudioChunk, AudioRequest, AudioSource, RecognizeRequest, SessionError};
use tokio::sync::mpsc;

/// Ordered handoff of audio chunks to a single consumer.
///
/// Enqueueing never blocks. Once closed, further audio is dropped.
pub struct IngestQueue {
    tx: Option<mpsc::UnboundedSender<AudioChunk>>,
    rx: Option<mpsc::UnboundedReceiver<AudioChunk>>,
    next_sequence: u64,
    inline_bytes: u64,
}

impl IngestQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Some(tx),
            rx: Some(rx),
            next_sequence: 0,
            inline_bytes: 0,
        }
    }

    /// The consumer end. Only one consumer exists, so this yields `Some` once.
    pub fn take_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<AudioChunk>> {
        self.rx.take()
    }

    /// Accepts a follow-up request of an already configured session.
    pub fn accept(&mut self, request: RecognizeRequest) -> Result<Option<u64>, SessionError> {
        if request.initial_request.is_some() {
            return Err(SessionError::UnexpectedConfig);
        }
        self.push(request.audio_request.unwrap_or_default())
    }

    /// Validates and enqueues one chunk. Returns its sequence number, or
    /// `None` when the queue no longer takes audio.
    pub fn push(&mut self, request: AudioRequest) -> Result<Option<u64>, SessionError> {
        let source = AudioSource::try_from(request)?;

        let Some(tx) = self.tx.as_ref() else {
            tracing::warn!("audio arrived after input was closed, dropping");
            return Ok(None);
        };

        let chunk = AudioChunk {
            sequence: self.next_sequence,
            source,
        };
        let len = chunk.inline_len() as u64;
        if tx.send(chunk).is_err() {
            tracing::warn!("audio consumer is gone, dropping chunk");
            return Ok(None);
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.inline_bytes += len;
        tracing::trace!(sequence, bytes = len, "audio chunk enqueued");
        Ok(Some(sequence))
    }

    pub fn close(&mut self) {
        if self.tx.take().is_some() {
            tracing::debug!(chunks = self.next_sequence, "audio input closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    pub fn chunks_received(&self) -> u64 {
        self.next_sequence
    }

    pub fn inline_bytes(&self) -> u64 {
        self.inline_bytes
    }
}

impl Default for IngestQueue {
    fn default() -> Self {
        Self::new()
    }
}

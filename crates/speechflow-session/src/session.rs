use crate::endpointer::{EndpointerEmitter, EndpointerState};
use crate::ingest::IngestQueue;
use crate::ledger::ResultLedger;
use crate::sequencer::ResponseSequencer;
use crate::validator::ConfigValidator;
use chrono::Utc;
use speechflow_core::{
    AudioChunk, DeliveryMode, EmbeddedMessage, EndpointerEvent, EngineError,
    NonStreamingRecognizeResponse, OperationMetadata, RecognitionResult, RecognizeRequest,
    RecognizeResponse, SessionConfig, SessionError, SessionRuntime, Status, StatusCode,
};
use tokio::sync::mpsc;

/// What the recognition pipeline reports back to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineSignal {
    Update {
        result_index: usize,
        results: Vec<RecognitionResult>,
    },
    Boundary(EndpointerEvent),
    Failed(EngineError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingConfig,
    Active,
    Completed,
    Failed,
}

/// Terminal result of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed {
        /// Final state of the ledger.
        results: Vec<RecognitionResult>,
        /// Every response of a buffered session; empty when streamed or written out.
        response: NonStreamingRecognizeResponse,
        metadata: OperationMetadata,
    },
    Failed {
        status: Status,
        metadata: OperationMetadata,
    },
}

impl SessionOutcome {
    /// Outcome of a session whose task never reported back.
    pub fn aborted(session_id: &str, reason: impl Into<String>) -> Self {
        let mut metadata = OperationMetadata::new("", Utc::now());
        let reason = reason.into();
        metadata.record_event(format!("session {session_id} aborted: {reason}"));
        metadata.finish(Utc::now());
        SessionOutcome::Failed {
            status: Status::new(StatusCode::Internal, reason),
            metadata,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Completed { .. })
    }

    pub fn status(&self) -> Option<&Status> {
        match self {
            SessionOutcome::Failed { status, .. } => Some(status),
            SessionOutcome::Completed { .. } => None,
        }
    }

    pub fn results(&self) -> &[RecognitionResult] {
        match self {
            SessionOutcome::Completed { results, .. } => results,
            SessionOutcome::Failed { .. } => &[],
        }
    }

    pub fn response(&self) -> Option<&NonStreamingRecognizeResponse> {
        match self {
            SessionOutcome::Completed { response, .. } => Some(response),
            SessionOutcome::Failed { .. } => None,
        }
    }

    pub fn metadata(&self) -> &OperationMetadata {
        match self {
            SessionOutcome::Completed { metadata, .. }
            | SessionOutcome::Failed { metadata, .. } => metadata,
        }
    }

    /// Empties the inline response once it was delivered elsewhere.
    pub fn clear_inline_response(&mut self, destination: &str) {
        if let SessionOutcome::Completed {
            response, metadata, ..
        } = self
        {
            *response = NonStreamingRecognizeResponse::default();
            metadata.record_event(format!("output written to {destination}"));
        }
    }

    /// Turns a completed outcome into a failure, keeping the event log.
    pub fn into_failed(self, status: Status) -> Self {
        let mut metadata = match self {
            SessionOutcome::Completed { metadata, .. }
            | SessionOutcome::Failed { metadata, .. } => metadata,
        };
        metadata.record_event(format!("session failed: {}", status.message));
        SessionOutcome::Failed { status, metadata }
    }
}

/// One recognition session: a single sequential timeline of inbound
/// requests and pipeline signals.
///
/// Any error is terminal. The first one becomes the session status and every
/// later input is ignored.
pub struct Session {
    id: String,
    mode: DeliveryMode,
    validator: ConfigValidator,
    state: SessionState,
    config: Option<SessionConfig>,
    ingest: IngestQueue,
    ledger: ResultLedger,
    endpointer: Option<EndpointerEmitter>,
    sequencer: ResponseSequencer,
    input_closed: bool,
    utterance_settled: bool,
    error: Option<SessionError>,
    metadata: OperationMetadata,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        mode: DeliveryMode,
        validator: ConfigValidator,
        project_id: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let mut metadata = OperationMetadata::new(project_id, Utc::now());
        metadata.record_event(format!("session {id} opened ({mode:?})"));
        Self {
            id,
            mode,
            validator,
            state: SessionState::AwaitingConfig,
            config: None,
            ingest: IngestQueue::new(),
            ledger: ResultLedger::new(),
            endpointer: None,
            sequencer: ResponseSequencer::new(mode),
            input_closed: false,
            utterance_settled: false,
            error: None,
            metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn ledger(&self) -> &ResultLedger {
        &self.ledger
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn endpointer_state(&self) -> Option<EndpointerState> {
        self.endpointer.as_ref().map(|e| e.state())
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, SessionState::Completed | SessionState::Failed)
    }

    pub fn is_input_closed(&self) -> bool {
        self.input_closed
    }

    /// A single-utterance session got its final result. No further audio
    /// needs recognizing; only the end of audio is still awaited.
    pub fn is_utterance_settled(&self) -> bool {
        self.utterance_settled
    }

    /// Consumer end of the audio queue, handed to the recognition pipeline.
    pub fn take_audio_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<AudioChunk>> {
        self.ingest.take_receiver()
    }

    pub fn handle_request(&mut self, request: RecognizeRequest) -> Result<(), SessionError> {
        if self.is_terminated() {
            tracing::debug!(session_id = %self.id, "request after termination ignored");
            return Ok(());
        }
        let result = match self.state {
            SessionState::AwaitingConfig => self.accept_first(request),
            _ => self.ingest.accept(request).map(|_| ()),
        };
        result.map_err(|e| self.fail(e))
    }

    pub fn apply_signal(&mut self, signal: PipelineSignal) -> Result<(), SessionError> {
        if self.is_terminated() {
            tracing::trace!(session_id = %self.id, "signal after termination ignored");
            return Ok(());
        }
        let result = match signal {
            PipelineSignal::Update {
                result_index,
                results,
            } => self.apply_update(result_index, results),
            PipelineSignal::Boundary(event) => self.apply_boundary(event),
            PipelineSignal::Failed(e) => Err(SessionError::Engine(e)),
        };
        result.map_err(|e| self.fail(e))
    }

    /// The caller finished sending. The session completes once the pipeline
    /// reports the end of audio.
    pub fn close_input(&mut self) {
        if self.is_terminated() || self.input_closed {
            return;
        }
        if self.state == SessionState::AwaitingConfig {
            self.fail(SessionError::InvalidConfig(
                "stream closed before a session config was sent".to_string(),
            ));
            return;
        }
        self.input_closed = true;
        self.ingest.close();
        self.metadata.record_event(format!(
            "audio input closed after {} chunk(s), {} inline byte(s)",
            self.ingest.chunks_received(),
            self.ingest.inline_bytes()
        ));
    }

    pub fn cancel(&mut self) {
        if !self.is_terminated() {
            self.fail(SessionError::SessionCancelled);
        }
    }

    /// Responses ready to go out now.
    pub fn drain_outbound(&mut self) -> Vec<RecognizeResponse> {
        self.sequencer.drain_ready()
    }

    /// Builds the terminal outcome. A session that has not terminated yet is cancelled.
    pub fn finish(mut self) -> SessionOutcome {
        self.cancel();
        self.metadata.finish(Utc::now());
        self.metadata.runtime_metadata = Some(EmbeddedMessage::SessionRuntime(SessionRuntime {
            session_id: self.id.clone(),
            chunks_received: self.ingest.chunks_received(),
            results_settled: self.ledger.settled_len() as u64,
        }));

        match self.error {
            Some(e) => SessionOutcome::Failed {
                status: e.to_status(),
                metadata: self.metadata,
            },
            None => SessionOutcome::Completed {
                response: NonStreamingRecognizeResponse {
                    responses: self.sequencer.release(),
                },
                results: self.ledger.into_results(),
                metadata: self.metadata,
            },
        }
    }

    fn accept_first(&mut self, request: RecognizeRequest) -> Result<(), SessionError> {
        let Some(config) = request.initial_request else {
            return Err(SessionError::InvalidConfig(
                "first request must carry the session config".to_string(),
            ));
        };
        let config = self.validator.validate(config, self.mode)?;

        self.endpointer = Some(EndpointerEmitter::from_config(&config));
        self.sequencer.set_interim_results(config.interim_results);
        self.metadata.request = Some(EmbeddedMessage::InitialRecognizeRequest(config.clone()));
        self.metadata.record_event(format!(
            "session config accepted ({:?}, {} Hz, {})",
            config.encoding, config.sample_rate, config.language_code
        ));
        tracing::info!(
            session_id = %self.id,
            encoding = ?config.encoding,
            sample_rate = config.sample_rate,
            continuous = config.continuous,
            "session configured"
        );
        self.config = Some(config);
        self.state = SessionState::Active;

        if let Some(audio) = request.audio_request {
            self.ingest.push(audio)?;
        }
        Ok(())
    }

    fn apply_update(
        &mut self,
        result_index: usize,
        mut results: Vec<RecognitionResult>,
    ) -> Result<(), SessionError> {
        let Some(config) = self.config.as_ref() else {
            return Err(SessionError::InvalidLedgerUpdate(
                "update before the session was configured".to_string(),
            ));
        };
        if self.utterance_settled {
            tracing::debug!(session_id = %self.id, "update after settled utterance ignored");
            return Ok(());
        }

        let max_alternatives = config.effective_max_alternatives();
        let single_utterance = !config.continuous;
        for result in &mut results {
            result.alternatives.truncate(max_alternatives);
        }

        let update = self.ledger.apply_update(result_index, results)?;
        let settles = update.has_final();
        self.sequencer.push_update(update);

        if settles && single_utterance {
            self.settle_utterance()?;
        }
        Ok(())
    }

    /// The first final result ends a single-utterance session.
    fn settle_utterance(&mut self) -> Result<(), SessionError> {
        self.utterance_settled = true;
        self.metadata.record_event("utterance settled");
        if self.input_closed {
            // The pipeline still owes the end of audio.
            return Ok(());
        }
        self.ingest.close();
        self.emit_boundary(EndpointerEvent::EndOfUtterance)?;
        self.complete();
        Ok(())
    }

    fn apply_boundary(&mut self, event: EndpointerEvent) -> Result<(), SessionError> {
        if self.utterance_settled && event != EndpointerEvent::EndOfAudio {
            tracing::debug!(
                session_id = %self.id,
                ?event,
                "boundary after settled utterance ignored"
            );
            return Ok(());
        }
        if event == EndpointerEvent::EndOfAudio
            && self.endpointer_state() == Some(EndpointerState::SpeechActive)
        {
            self.emit_boundary(EndpointerEvent::EndOfSpeech)?;
        }
        self.emit_boundary(event)?;

        match event {
            EndpointerEvent::EndOfAudio => self.complete(),
            EndpointerEvent::EndOfUtterance => {
                self.ingest.close();
                self.complete();
            }
            _ => {}
        }
        Ok(())
    }

    fn emit_boundary(&mut self, event: EndpointerEvent) -> Result<(), SessionError> {
        let endpointer = self.endpointer.as_mut().ok_or_else(|| {
            SessionError::IllegalEventSequence(format!("{event:?} before session config"))
        })?;
        if let Some(event) = endpointer.signal(event)? {
            self.sequencer.push_event(event);
        }
        Ok(())
    }

    fn complete(&mut self) {
        self.ingest.close();
        self.state = SessionState::Completed;
        self.metadata.record_event(format!(
            "session completed with {} settled result(s)",
            self.ledger.settled_len()
        ));
        tracing::info!(
            session_id = %self.id,
            settled = self.ledger.settled_len(),
            chunks = self.ingest.chunks_received(),
            "session completed"
        );
    }

    /// Moves the session into its terminal error state. Returns the error for chaining.
    fn fail(&mut self, error: SessionError) -> SessionError {
        if self.is_terminated() {
            return error;
        }
        let status = error.to_status();
        if error == SessionError::SessionCancelled {
            tracing::info!(session_id = %self.id, "session cancelled");
        } else {
            tracing::warn!(session_id = %self.id, "session failed: {error}");
        }
        self.ingest.close();
        self.sequencer.fail(status);
        self.metadata.record_event(format!("session failed: {error}"));
        self.state = SessionState::Failed;
        self.error = Some(error.clone());
        error
    }
}

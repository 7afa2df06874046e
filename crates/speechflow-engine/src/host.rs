use crate::engine_trait::RecognitionEngine;
use crate::registry::EngineRegistry;
use speechflow_core::{
    AppConfig, AudioChunk, DeliveryMode, EngineError, RecognizeRequest, RecognizeResponse, Status,
    StatusCode,
};
use speechflow_destination::{OutcomeRecord, WriterRegistry};
use speechflow_session::{ConfigValidator, PipelineSignal, Session, SessionOutcome, SessionState};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Opens sessions and drives each one on its own task.
pub struct SessionHost {
    engine_name: String,
    settings: toml::Value,
    default_language: String,
    project_id: String,
    engines: EngineRegistry,
    writers: WriterRegistry,
}

impl SessionHost {
    pub fn new() -> Self {
        Self::from_config(&AppConfig::default())
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            engine_name: config.engine.name.clone(),
            settings: config.engine.settings.clone(),
            default_language: config.session.default_language.clone(),
            project_id: config.operation.project_id.clone(),
            engines: EngineRegistry::new(),
            writers: WriterRegistry::new(),
        }
    }

    pub fn with_engine(mut self, name: &str, settings: toml::Value) -> Self {
        self.engine_name = name.to_string();
        self.settings = settings;
        self
    }

    pub fn with_engine_registry(mut self, engines: EngineRegistry) -> Self {
        self.engines = engines;
        self
    }

    pub fn with_writer_registry(mut self, writers: WriterRegistry) -> Self {
        self.writers = writers;
        self
    }

    pub fn with_project_id(mut self, project_id: &str) -> Self {
        self.project_id = project_id.to_string();
        self
    }

    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    /// Starts a session. The engine is created up front so an unknown
    /// engine name fails here rather than mid-stream.
    pub fn open_session(&self, mode: DeliveryMode) -> Result<SessionHandle, EngineError> {
        let engine = self.engines.create(&self.engine_name)?;
        let id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(
            id.clone(),
            mode,
            ConfigValidator::new(self.default_language.clone()),
            self.project_id.clone(),
        );

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        tracing::info!(session_id = %id, engine = %self.engine_name, ?mode, "session opened");
        let task = tokio::spawn(run_session(
            session,
            engine,
            self.settings.clone(),
            self.writers.clone(),
            request_rx,
            response_tx,
            cancel_rx,
        ));

        Ok(SessionHandle {
            id,
            request_tx: Some(request_tx),
            response_rx: Some(response_rx),
            cancel_tx: Some(cancel_tx),
            task,
        })
    }
}

impl Default for SessionHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller side of a running session.
pub struct SessionHandle {
    id: String,
    request_tx: Option<mpsc::UnboundedSender<RecognizeRequest>>,
    response_rx: Option<mpsc::UnboundedReceiver<RecognizeResponse>>,
    cancel_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns false once the session no longer takes requests.
    pub fn send(&self, request: RecognizeRequest) -> bool {
        self.request_tx
            .as_ref()
            .is_some_and(|tx| tx.send(request).is_ok())
    }

    /// Ends the inbound stream.
    pub fn close(&mut self) {
        self.request_tx = None;
    }

    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Responses of a streaming session, in delivery order.
    pub fn take_response_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<RecognizeResponse>> {
        self.response_rx.take()
    }

    /// Closes the inbound stream and waits for the outcome.
    pub async fn join(mut self) -> SessionOutcome {
        self.close();
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(session_id = %self.id, "session task failed: {e}");
                SessionOutcome::aborted(&self.id, e.to_string())
            }
        }
    }
}

async fn run_session(
    mut session: Session,
    engine: Box<dyn RecognitionEngine>,
    settings: toml::Value,
    writers: WriterRegistry,
    mut request_rx: mpsc::UnboundedReceiver<RecognizeRequest>,
    response_tx: mpsc::UnboundedSender<RecognizeResponse>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> SessionOutcome {
    let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
    let mut idle = Some((engine, signal_tx));
    let mut pipeline: Option<Pipeline> = None;
    let mut input_open = true;
    let mut cancel_armed = true;

    while !session.is_terminated() {
        tokio::select! {
            biased;
            cancelled = &mut cancel_rx, if cancel_armed => {
                cancel_armed = false;
                if cancelled.is_ok() {
                    session.cancel();
                }
            }
            request = request_rx.recv(), if input_open => match request {
                Some(request) => {
                    // Errors are recorded by the session and end the loop.
                    let _ = session.handle_request(request);
                    if session.state() == SessionState::Active {
                        if let Some((engine, tx)) = idle.take() {
                            pipeline =
                                start_pipeline(&mut session, engine, settings.clone(), tx).await;
                        }
                    }
                }
                None => {
                    input_open = false;
                    session.close_input();
                }
            },
            signal = signal_rx.recv() => {
                let signal = signal.unwrap_or_else(|| {
                    PipelineSignal::Failed(EngineError::ProcessingFailed(
                        "pipeline stopped before end of audio".to_string(),
                    ))
                });
                let _ = session.apply_signal(signal);
            }
        }

        if session.is_utterance_settled() {
            if let Some(pipeline) = pipeline.as_mut() {
                pipeline.stop_feeding();
            }
        }

        for response in session.drain_outbound() {
            if response_tx.send(response).is_err() {
                tracing::trace!(session_id = %session.id(), "response receiver dropped");
            }
        }
    }

    if let Some(pipeline) = pipeline {
        pipeline.task.abort();
    }

    let session_id = session.id().to_string();
    let output_uri = match session.mode() {
        DeliveryMode::Buffered => session
            .config()
            .and_then(|c| c.output_uri())
            .map(str::to_string),
        DeliveryMode::Streaming => None,
    };

    let mut outcome = session.finish();
    if let Some(uri) = output_uri.filter(|_| outcome.is_success()) {
        outcome = write_outcome(&writers, &uri, outcome).await;
    }

    match outcome.status() {
        None => tracing::info!(session_id = %session_id, "session completed"),
        Some(status) => tracing::info!(
            session_id = %session_id,
            code = status.code,
            "session ended: {}",
            status.message
        ),
    }
    outcome
}

/// The task feeding a session's audio to its engine.
struct Pipeline {
    task: JoinHandle<()>,
    stop: Option<oneshot::Sender<()>>,
}

impl Pipeline {
    /// Skips the audio still queued and goes straight to the end of audio.
    fn stop_feeding(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn start_pipeline(
    session: &mut Session,
    mut engine: Box<dyn RecognitionEngine>,
    settings: toml::Value,
    signal_tx: mpsc::UnboundedSender<PipelineSignal>,
) -> Option<Pipeline> {
    let config = session.config().cloned()?;
    let audio_rx = session.take_audio_receiver()?;

    engine.set_signal_sender(signal_tx.clone());
    if let Err(e) = engine.initialize(settings, &config).await {
        tracing::error!(session_id = %session.id(), "engine initialization failed: {e}");
        let _ = session.apply_signal(PipelineSignal::Failed(e));
        return None;
    }

    tracing::debug!(session_id = %session.id(), engine = engine.name(), "pipeline started");
    let (stop_tx, stop_rx) = oneshot::channel();
    let task = tokio::spawn(drain_audio(
        session.id().to_string(),
        engine,
        audio_rx,
        stop_rx,
        signal_tx,
    ));
    Some(Pipeline {
        task,
        stop: Some(stop_tx),
    })
}

/// Feeds queued audio to the engine in order, then tells it the audio ended.
async fn drain_audio(
    session_id: String,
    engine: Box<dyn RecognitionEngine>,
    mut audio_rx: mpsc::UnboundedReceiver<AudioChunk>,
    mut stop_rx: oneshot::Receiver<()>,
    signal_tx: mpsc::UnboundedSender<PipelineSignal>,
) {
    let mut result = Ok(());
    loop {
        let chunk = tokio::select! {
            biased;
            _ = &mut stop_rx => {
                tracing::debug!(session_id = %session_id, "audio feed stopped");
                None
            }
            chunk = audio_rx.recv() => chunk,
        };
        let Some(chunk) = chunk else {
            break;
        };
        result = engine.feed_audio(chunk).await;
        if result.is_err() {
            break;
        }
    }
    if result.is_ok() {
        result = engine.finish_audio().await;
    }
    if let Err(e) = result {
        tracing::error!(session_id = %session_id, "engine error: {e}");
        let _ = signal_tx.send(PipelineSignal::Failed(e));
    }
    if let Err(e) = engine.shutdown().await {
        tracing::warn!(session_id = %session_id, "engine shutdown failed: {e}");
    }
}

async fn write_outcome(
    writers: &WriterRegistry,
    uri: &str,
    mut outcome: SessionOutcome,
) -> SessionOutcome {
    let Some(response) = outcome.response().cloned() else {
        return outcome;
    };
    let record = OutcomeRecord {
        metadata: outcome.metadata().clone(),
        response,
    };

    let written = match writers.resolve(uri) {
        Ok(writer) => writer.write(uri, &record).await,
        Err(e) => Err(e),
    };
    match written {
        Ok(()) => {
            outcome.clear_inline_response(uri);
            outcome
        }
        Err(e) => {
            tracing::error!(uri, "failed to write session outcome: {e}");
            outcome.into_failed(Status::new(StatusCode::Unavailable, e.to_string()))
        }
    }
}

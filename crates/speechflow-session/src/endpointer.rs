use speechflow_core::{EndpointerEvent, SessionConfig, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointerState {
    Idle,
    SpeechActive,
    SpeechEnded,
    AudioEnded,
    UtteranceEnded,
}

/// Tracks speech boundaries of a session and decides which events go out.
///
/// The state machine always advances; events only surface when the session
/// asked for them.
#[derive(Debug, Clone)]
pub struct EndpointerEmitter {
    state: EndpointerState,
    continuous: bool,
    enabled: bool,
}

impl EndpointerEmitter {
    pub fn new(continuous: bool, enabled: bool) -> Self {
        Self {
            state: EndpointerState::Idle,
            continuous,
            enabled,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.continuous, config.enable_endpointer_events)
    }

    pub fn state(&self) -> EndpointerState {
        self.state
    }

    /// Applies a boundary signal. Returns the event to emit, if events are enabled.
    pub fn signal(
        &mut self,
        event: EndpointerEvent,
    ) -> Result<Option<EndpointerEvent>, SessionError> {
        use EndpointerState::*;

        let next = match (event, self.state) {
            (EndpointerEvent::StartOfSpeech, Idle | SpeechEnded) => SpeechActive,
            (EndpointerEvent::EndOfSpeech, SpeechActive) => SpeechEnded,
            (EndpointerEvent::EndOfAudio, Idle | SpeechEnded) => AudioEnded,
            (EndpointerEvent::EndOfUtterance, _) if self.continuous => {
                return Err(SessionError::IllegalEventSequence(
                    "END_OF_UTTERANCE on a continuous session".to_string(),
                ));
            }
            (EndpointerEvent::EndOfUtterance, Idle | SpeechActive | SpeechEnded | AudioEnded) => {
                UtteranceEnded
            }
            (event, state) => {
                return Err(SessionError::IllegalEventSequence(format!(
                    "{event:?} not allowed in state {state:?}"
                )));
            }
        };

        tracing::debug!(from = ?self.state, to = ?next, ?event, "endpointer transition");
        self.state = next;
        Ok(self.enabled.then_some(event))
    }
}

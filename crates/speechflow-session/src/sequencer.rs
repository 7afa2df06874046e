use crate::ledger::LedgerUpdate;
use speechflow_core::{DeliveryMode, EndpointerEvent, RecognizeResponse, Status};
use std::collections::VecDeque;

/// Orders outbound responses of one session.
///
/// Responses leave in the order they were pushed. Streaming sessions make
/// each response ready immediately; buffered sessions hold everything until
/// [`release`](Self::release).
#[derive(Debug)]
pub struct ResponseSequencer {
    mode: DeliveryMode,
    interim_results: bool,
    ready: VecDeque<RecognizeResponse>,
    held: Vec<RecognizeResponse>,
    halted: bool,
}

impl ResponseSequencer {
    pub fn new(mode: DeliveryMode) -> Self {
        Self {
            mode,
            interim_results: false,
            ready: VecDeque::new(),
            held: Vec::new(),
            halted: false,
        }
    }

    pub fn with_interim_results(mut self, enabled: bool) -> Self {
        self.interim_results = enabled;
        self
    }

    pub fn set_interim_results(&mut self, enabled: bool) {
        self.interim_results = enabled;
    }

    /// Sequences a ledger update. Non-final results are stripped unless
    /// interim results were requested; an update left empty is skipped.
    /// Returns whether a response was produced.
    pub fn push_update(&mut self, update: LedgerUpdate) -> bool {
        let LedgerUpdate {
            result_index,
            mut results,
        } = update;
        if !self.interim_results {
            results.retain(|r| r.is_final);
            if results.is_empty() {
                return false;
            }
        }
        self.push(RecognizeResponse::update(result_index, results))
    }

    pub fn push_event(&mut self, event: EndpointerEvent) -> bool {
        self.push(RecognizeResponse::endpoint(event))
    }

    /// Terminates the sequence with an error. Held responses are discarded;
    /// streaming sessions get the status as their last response.
    pub fn fail(&mut self, status: Status) {
        if self.halted {
            return;
        }
        let discarded = self.held.len();
        self.held.clear();
        if self.mode == DeliveryMode::Streaming {
            self.ready.push_back(RecognizeResponse::error(status));
        }
        self.halted = true;
        tracing::debug!(discarded, "response sequence failed");
    }

    /// Responses ready to send now. Always empty for buffered sessions.
    pub fn drain_ready(&mut self) -> Vec<RecognizeResponse> {
        self.ready.drain(..).collect()
    }

    /// Releases every held response at once and stops sequencing.
    pub fn release(&mut self) -> Vec<RecognizeResponse> {
        self.halted = true;
        std::mem::take(&mut self.held)
    }

    fn push(&mut self, response: RecognizeResponse) -> bool {
        if self.halted {
            tracing::trace!("sequencer halted, response dropped");
            return false;
        }
        match self.mode {
            DeliveryMode::Streaming => self.ready.push_back(response),
            DeliveryMode::Buffered => self.held.push(response),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speechflow_core::{RecognitionAlternative, RecognitionResult, StatusCode};

    fn interim(text: &str) -> RecognitionResult {
        RecognitionResult::interim(vec![RecognitionAlternative::new(text)], Some(0.3))
    }

    fn settled(text: &str) -> RecognitionResult {
        RecognitionResult::settled(vec![RecognitionAlternative::new(text)])
    }

    fn update(index: i32, results: Vec<RecognitionResult>) -> LedgerUpdate {
        LedgerUpdate {
            result_index: index,
            results,
        }
    }

    #[test]
    fn test_streaming_emits_in_push_order() {
        let mut seq = ResponseSequencer::new(DeliveryMode::Streaming).with_interim_results(true);
        seq.push_event(EndpointerEvent::StartOfSpeech);
        seq.push_update(update(0, vec![interim("hel")]));
        seq.push_event(EndpointerEvent::EndOfSpeech);
        seq.push_update(update(0, vec![settled("hello")]));

        let out = seq.drain_ready();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].endpoint, EndpointerEvent::StartOfSpeech);
        assert!(!out[1].results[0].is_final);
        assert_eq!(out[2].endpoint, EndpointerEvent::EndOfSpeech);
        assert!(out[3].results[0].is_final);
        assert!(seq.drain_ready().is_empty());
    }

    #[test]
    fn test_interim_gated_off() {
        let mut seq = ResponseSequencer::new(DeliveryMode::Streaming);
        assert!(!seq.push_update(update(0, vec![interim("hel")])));
        assert!(seq.push_update(update(0, vec![settled("hello"), interim("wor")])));

        let out = seq.drain_ready();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].results.len(), 1);
        assert!(out[0].results[0].is_final);
    }

    #[test]
    fn test_buffered_releases_once_at_completion() {
        let mut seq = ResponseSequencer::new(DeliveryMode::Buffered).with_interim_results(true);
        seq.push_update(update(0, vec![interim("a")]));
        seq.push_event(EndpointerEvent::EndOfAudio);
        assert!(seq.drain_ready().is_empty());

        let released = seq.release();
        assert_eq!(released.len(), 2);
        assert!(seq.release().is_empty());
        assert!(!seq.push_event(EndpointerEvent::EndOfAudio));
    }

    #[test]
    fn test_buffered_failure_discards_held() {
        let mut seq = ResponseSequencer::new(DeliveryMode::Buffered);
        seq.push_update(update(0, vec![settled("a")]));
        seq.fail(Status::new(StatusCode::Cancelled, "session cancelled"));
        assert!(seq.drain_ready().is_empty());
        assert!(seq.release().is_empty());
    }

    #[test]
    fn test_streaming_failure_is_last_response() {
        let mut seq = ResponseSequencer::new(DeliveryMode::Streaming);
        seq.push_update(update(0, vec![settled("a")]));
        seq.fail(Status::new(StatusCode::Internal, "boom"));
        seq.push_event(EndpointerEvent::EndOfAudio);
        seq.fail(Status::new(StatusCode::Internal, "again"));

        let out = seq.drain_ready();
        assert_eq!(out.len(), 2);
        assert!(out[1].is_error());
        assert_eq!(out[1].error.as_ref().unwrap().message, "boom");
    }
}

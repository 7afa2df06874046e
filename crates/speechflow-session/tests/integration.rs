use speechflow_core::{
    AudioEncoding, AudioRequest, DeliveryMode, EndpointerEvent, RecognitionAlternative,
    RecognitionResult, RecognizeRequest, RecognizeResponse, SessionConfig, SessionError,
    StatusCode,
};
use speechflow_session::{ConfigValidator, PipelineSignal, ResultLedger, Session, SessionState};

fn linear16(continuous: bool, events: bool) -> SessionConfig {
    SessionConfig {
        encoding: AudioEncoding::Linear16,
        sample_rate: 16000,
        max_alternatives: 1,
        continuous,
        enable_endpointer_events: events,
        ..Default::default()
    }
}

fn new_session(mode: DeliveryMode) -> Session {
    Session::new("integ", mode, ConfigValidator::default(), "proj")
}

fn settled(text: &str) -> RecognitionResult {
    RecognitionResult::settled(vec![RecognitionAlternative::new(text).with_confidence(0.9)])
}

fn interim(text: &str) -> RecognitionResult {
    RecognitionResult::interim(vec![RecognitionAlternative::new(text)], Some(0.5))
}

/// Replays what a pipeline reports for one short utterance.
fn run_single_chunk(events: bool) -> Vec<RecognizeResponse> {
    let mut session = new_session(DeliveryMode::Streaming);
    session
        .handle_request(RecognizeRequest::config(linear16(false, events)))
        .unwrap();
    session
        .handle_request(RecognizeRequest::audio(AudioRequest::inline(vec![0; 320])))
        .unwrap();
    session.close_input();

    let signals = [
        PipelineSignal::Boundary(EndpointerEvent::StartOfSpeech),
        PipelineSignal::Update {
            result_index: 0,
            results: vec![interim("hel")],
        },
        PipelineSignal::Boundary(EndpointerEvent::EndOfSpeech),
        PipelineSignal::Update {
            result_index: 0,
            results: vec![settled("hello")],
        },
        PipelineSignal::Boundary(EndpointerEvent::EndOfAudio),
    ];
    let mut out = Vec::new();
    for signal in signals {
        session.apply_signal(signal).unwrap();
        out.extend(session.drain_outbound());
    }
    assert_eq!(session.state(), SessionState::Completed);
    out
}

#[test]
fn test_single_chunk_yields_one_final_update() {
    for events in [false, true] {
        let out = run_single_chunk(events);
        let updates: Vec<_> = out.iter().filter(|r| !r.results.is_empty()).collect();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].results.len(), 1);
        assert!(updates[0].results[0].is_final);
        assert_eq!(updates[0].results[0].alternatives.len(), 1);

        let ends_with_audio_end = out
            .last()
            .is_some_and(|r| r.endpoint == EndpointerEvent::EndOfAudio);
        assert_eq!(ends_with_audio_end, events);
        if !events {
            assert_eq!(out.len(), 1);
        }
    }
}

#[test]
fn test_low_sample_rate_rejected_before_audio() {
    let mut session = new_session(DeliveryMode::Streaming);
    let mut audio = session.take_audio_receiver().unwrap();
    let config = SessionConfig {
        sample_rate: 7000,
        ..linear16(false, false)
    };
    let result = session.handle_request(RecognizeRequest::config(config));
    assert!(matches!(result, Err(SessionError::InvalidConfig(_))));

    session
        .handle_request(RecognizeRequest::audio(AudioRequest::inline(vec![1])))
        .unwrap();
    assert!(audio.try_recv().is_err());
}

#[test]
fn test_chunk_with_content_and_uri_ends_session_without_output() {
    let mut session = new_session(DeliveryMode::Streaming);
    session
        .handle_request(RecognizeRequest::config(linear16(false, true)))
        .unwrap();
    let request = RecognizeRequest::audio(AudioRequest {
        content: vec![1, 2, 3],
        uri: "gs://bucket/audio.raw".to_string(),
    });
    assert!(matches!(
        session.handle_request(request),
        Err(SessionError::InvalidAudioChunk(_))
    ));

    let out = session.drain_outbound();
    assert_eq!(out.len(), 1);
    assert!(out[0].results.is_empty());
    assert!(out[0].error.as_ref().unwrap().is(StatusCode::InvalidArgument));

    let outcome = session.finish();
    assert!(outcome.results().is_empty());
}

#[test]
fn test_rewrite_from_lower_index_keeps_prefix() {
    let mut ledger = ResultLedger::new();
    ledger
        .apply_update(0, vec![settled("one"), interim("two"), interim("three")])
        .unwrap();
    let i1 = 2;
    ledger
        .apply_update(i1, vec![interim("three!"), interim("four")])
        .unwrap();
    let before = ledger.slots()[..1].to_vec();

    let i2 = 1;
    ledger.apply_update(i2, vec![interim("TWO")]).unwrap();
    assert_eq!(&ledger.slots()[..i2], before.as_slice());
    let tail: Vec<_> = ledger.slots()[i2..]
        .iter()
        .filter_map(|r| r.transcript())
        .collect();
    assert_eq!(tail, vec!["TWO"]);
}

#[test]
fn test_two_finals_in_one_update_rejected() {
    let mut session = new_session(DeliveryMode::Buffered);
    session
        .handle_request(RecognizeRequest::config(linear16(true, false)))
        .unwrap();
    let result = session.apply_signal(PipelineSignal::Update {
        result_index: 0,
        results: vec![settled("a"), settled("b")],
    });
    assert!(matches!(result, Err(SessionError::InvalidLedgerUpdate(_))));
    assert!(session.finish().status().unwrap().is(StatusCode::Internal));
}

#[test]
fn test_interim_results_streamed_when_requested() {
    let mut session = new_session(DeliveryMode::Streaming);
    let config = SessionConfig {
        interim_results: true,
        ..linear16(true, false)
    };
    session.handle_request(RecognizeRequest::config(config)).unwrap();

    for (index, result) in [(0, interim("to")), (0, interim("to be")), (0, settled("to be"))] {
        session
            .apply_signal(PipelineSignal::Update {
                result_index: index,
                results: vec![result],
            })
            .unwrap();
    }
    let out = session.drain_outbound();
    let finals: Vec<_> = out.iter().map(|r| r.results[0].is_final).collect();
    assert_eq!(finals, vec![false, false, true]);
}

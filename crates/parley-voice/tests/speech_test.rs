mod common;

use common::{Call, RecordingSession};
use parley_types::MAX_TEXT_LENGTH;
use parley_voice::{SpeakOutcome, SpeechSerializer, SpeechState};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn serializer(session: &Arc<RecordingSession>) -> Arc<SpeechSerializer> {
    Arc::new(SpeechSerializer::new(session.clone()))
}

#[tokio::test]
async fn test_valid_text_is_spoken_once() {
    let session = Arc::new(RecordingSession::new());
    let speech = serializer(&session);
    assert_eq!(speech.state(), SpeechState::Idle);

    let outcome = speech.speak("  Hello world  ").await;

    assert_eq!(outcome, SpeakOutcome::Spoken);
    assert_eq!(session.calls(), vec![Call::Interrupt, Call::say("Hello world")]);
    assert_eq!(speech.state(), SpeechState::Speaking);
}

#[tokio::test]
async fn test_text_at_limit_is_spoken() {
    let session = Arc::new(RecordingSession::new());
    let speech = serializer(&session);
    let text = "x".repeat(MAX_TEXT_LENGTH);

    assert_eq!(speech.speak(&text).await, SpeakOutcome::Spoken);
    assert_eq!(session.say_texts(), vec![text]);
}

#[tokio::test]
async fn test_empty_and_oversized_text_make_no_calls() {
    let session = Arc::new(RecordingSession::new());
    let speech = serializer(&session);

    assert_eq!(speech.speak("").await, SpeakOutcome::Empty);
    assert_eq!(speech.speak(" \n\t ").await, SpeakOutcome::Empty);
    assert_eq!(
        speech.speak(&"y".repeat(MAX_TEXT_LENGTH + 1)).await,
        SpeakOutcome::Oversized
    );

    assert!(session.calls().is_empty());
    assert_eq!(speech.state(), SpeechState::Idle);
}

#[tokio::test]
async fn test_custom_length_limit() {
    let session = Arc::new(RecordingSession::new());
    let speech = SpeechSerializer::new(session.clone()).with_max_text_length(5);

    assert_eq!(speech.speak("hello").await, SpeakOutcome::Spoken);
    assert_eq!(speech.speak("hello!").await, SpeakOutcome::Oversized);
    assert_eq!(session.say_texts(), vec!["hello".to_string()]);
}

#[tokio::test]
async fn test_sequential_calls_interrupt_before_next_say() {
    let session = Arc::new(RecordingSession::new());
    let speech = serializer(&session);

    speech.speak("first").await;
    speech.speak("second").await;

    assert_eq!(
        session.calls(),
        vec![
            Call::Interrupt,
            Call::say("first"),
            Call::Interrupt,
            Call::say("second"),
        ]
    );
}

#[tokio::test]
async fn test_interrupt_failure_does_not_block_say() {
    let session = Arc::new(RecordingSession::new());
    session.fail_interrupt.store(true, Ordering::SeqCst);
    let speech = serializer(&session);

    assert_eq!(speech.speak("still spoken").await, SpeakOutcome::Spoken);
    assert_eq!(session.say_texts(), vec!["still spoken".to_string()]);
}

#[tokio::test]
async fn test_say_failure_is_isolated() {
    let session = Arc::new(RecordingSession::new());
    session.failing_says.store(1, Ordering::SeqCst);
    let speech = serializer(&session);

    assert_eq!(speech.speak("lost").await, SpeakOutcome::IssueFailed);
    assert_eq!(speech.speak("recovered").await, SpeakOutcome::Spoken);
    assert_eq!(
        session.say_texts(),
        vec!["lost".to_string(), "recovered".to_string()]
    );
}

#[tokio::test]
async fn test_failed_issue_leaves_serializer_idle() {
    let session = Arc::new(RecordingSession::new());
    let speech = serializer(&session);

    assert_eq!(speech.speak("first").await, SpeakOutcome::Spoken);
    assert_eq!(speech.state(), SpeechState::Speaking);

    session.failing_says.store(1, Ordering::SeqCst);
    assert_eq!(speech.speak("refused").await, SpeakOutcome::IssueFailed);
    assert_eq!(speech.state(), SpeechState::Idle);

    assert_eq!(speech.speak("again").await, SpeakOutcome::Spoken);
    assert_eq!(speech.state(), SpeechState::Speaking);
}

#[tokio::test]
async fn test_model_override_is_passed() {
    let session = Arc::new(RecordingSession::new());
    let speech =
        SpeechSerializer::new(session.clone()).with_tts_model(Some("tts-1-hd".to_string()));

    speech.speak("with model").await;

    assert_eq!(
        session.calls(),
        vec![
            Call::Interrupt,
            Call::Say {
                text: "with model".to_string(),
                tts_model: Some("tts-1-hd".to_string()),
            },
        ]
    );
}

#[tokio::test]
async fn test_rejected_model_override_retries_without_it() {
    let session = Arc::new(RecordingSession::new());
    session.reject_model_option.store(true, Ordering::SeqCst);
    let speech =
        SpeechSerializer::new(session.clone()).with_tts_model(Some("tts-1-hd".to_string()));

    assert_eq!(speech.speak("fallback").await, SpeakOutcome::Spoken);
    assert_eq!(
        session.calls(),
        vec![
            Call::Interrupt,
            Call::Say {
                text: "fallback".to_string(),
                tts_model: Some("tts-1-hd".to_string()),
            },
            Call::say("fallback"),
        ]
    );
}

#[tokio::test]
async fn test_failed_retry_is_swallowed() {
    let session = Arc::new(RecordingSession::new());
    session.reject_model_option.store(true, Ordering::SeqCst);
    session.failing_says.store(1, Ordering::SeqCst);
    let speech =
        SpeechSerializer::new(session.clone()).with_tts_model(Some("tts-1-hd".to_string()));

    assert_eq!(speech.speak("twice refused").await, SpeakOutcome::IssueFailed);
    // The override is still rejected, but the plain retry now succeeds.
    assert_eq!(speech.speak("next").await, SpeakOutcome::Spoken);
    assert_eq!(session.say_texts().len(), 4);
}

#[tokio::test]
async fn test_empty_model_override_is_ignored() {
    let session = Arc::new(RecordingSession::new());
    let speech = SpeechSerializer::new(session.clone()).with_tts_model(Some(String::new()));

    speech.speak("plain").await;
    assert_eq!(session.calls(), vec![Call::Interrupt, Call::say("plain")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_overlap() {
    let session = Arc::new(RecordingSession::new());
    session.say_delay_ms.store(20, Ordering::SeqCst);
    let speech = serializer(&session);

    let handles: Vec<_> = (0..8)
        .map(|i| speech.spawn_speak(format!("message {}", i)))
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), SpeakOutcome::Spoken);
    }

    assert_eq!(session.max_in_flight(), 1);

    // Every say is immediately preceded by its own interrupt.
    let calls = session.calls();
    assert_eq!(calls.len(), 16);
    for pair in calls.chunks(2) {
        assert_eq!(pair[0], Call::Interrupt);
        assert!(matches!(pair[1], Call::Say { .. }));
    }

    let mut spoken = session.say_texts();
    spoken.sort();
    let mut expected: Vec<String> = (0..8).map(|i| format!("message {}", i)).collect();
    expected.sort();
    assert_eq!(spoken, expected);
}

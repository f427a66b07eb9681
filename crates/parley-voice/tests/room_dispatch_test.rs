//! End-to-end tests from room events to speech session calls.

mod common;

use common::RecordingSession;
use parley_types::{DataPacket, EventArg, InboundEvent, TextRecord};
use parley_voice::room::DATA_RECEIVED_EVENT;
use parley_voice::{attach_room_handlers, AgentRoom, SpeechSerializer};
use std::sync::Arc;
use std::time::Duration;

async fn settle(session: &RecordingSession, expected_says: usize) -> Vec<String> {
    for _ in 0..100 {
        if session.say_texts().len() >= expected_says {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    // Give stray tasks a chance to show up before asserting exact counts.
    tokio::time::sleep(Duration::from_millis(20)).await;
    session.say_texts()
}

fn setup(room: AgentRoom) -> (Arc<AgentRoom>, Arc<RecordingSession>) {
    let room = Arc::new(room);
    let session = Arc::new(RecordingSession::new());
    let speech = Arc::new(SpeechSerializer::new(session.clone()));
    attach_room_handlers(room.as_ref(), speech);
    (room, session)
}

#[tokio::test]
async fn test_tts_topic_message_is_spoken() {
    let (room, session) = setup(AgentRoom::new("room-1", "agent"));

    let delivered = room.emit(
        DATA_RECEIVED_EVENT,
        InboundEvent::new()
            .with_topic("tts")
            .with_data(b"Hello world".to_vec()),
    );

    assert_eq!(delivered, 1);
    assert_eq!(settle(&session, 1).await, vec!["Hello world".to_string()]);
}

#[tokio::test]
async fn test_other_topic_is_dropped() {
    let (room, session) = setup(AgentRoom::new("room-1", "agent"));

    room.emit(
        DATA_RECEIVED_EVENT,
        InboundEvent::new().with_topic("chat").with_data("Hello world"),
    );

    assert!(settle(&session, 1).await.is_empty());
    assert!(session.calls().is_empty());
}

#[tokio::test]
async fn test_explicit_command_without_topic_is_spoken() {
    let (room, session) = setup(AgentRoom::new("room-1", "agent"));

    room.emit(
        DATA_RECEIVED_EVENT,
        InboundEvent::new().with_arg(EventArg::Packet(DataPacket::new(
            br#"{"type":"speak","text":"x"}"#.to_vec(),
            None,
        ))),
    );

    assert_eq!(settle(&session, 1).await, vec!["x".to_string()]);
}

#[tokio::test]
async fn test_legacy_positional_topic_is_honored() {
    let (room, session) = setup(AgentRoom::new("room-1", "agent"));

    room.emit(
        DATA_RECEIVED_EVENT,
        InboundEvent::new()
            .with_arg(EventArg::Bytes(b"legacy hello".to_vec()))
            .with_arg(EventArg::Opaque)
            .with_arg(EventArg::Opaque)
            .with_arg(EventArg::Text("tts".to_string())),
    );

    assert_eq!(settle(&session, 1).await, vec!["legacy hello".to_string()]);
}

#[tokio::test]
async fn test_malformed_payload_is_dropped() {
    let (room, session) = setup(AgentRoom::new("room-1", "agent"));

    room.emit(
        DATA_RECEIVED_EVENT,
        InboundEvent::new()
            .with_topic("tts")
            .with_data(vec![0xffu8, 0xfe, 0xfd]),
    );
    room.emit(
        DATA_RECEIVED_EVENT,
        InboundEvent::new().with_topic("tts").with_data("   "),
    );

    assert!(settle(&session, 1).await.is_empty());
}

#[tokio::test]
async fn test_text_stream_alias_feeds_same_serializer() {
    let (room, session) = setup(
        AgentRoom::new("room-1", "agent").with_events(&[DATA_RECEIVED_EVENT, "text_received"]),
    );

    room.emit(
        "text_received",
        InboundEvent::new().with_arg(EventArg::Record(TextRecord {
            text: Some("streamed".to_string()),
            message: None,
        })),
    );

    assert_eq!(settle(&session, 1).await, vec!["streamed".to_string()]);
}

#[tokio::test]
async fn test_room_without_text_stream_still_takes_data() {
    let (room, session) =
        setup(AgentRoom::new("room-1", "agent").with_events(&[DATA_RECEIVED_EVENT]));

    assert_eq!(room.emit("text_received", InboundEvent::new().with_text("lost")), 0);
    room.emit(
        DATA_RECEIVED_EVENT,
        InboundEvent::new().with_packet(DataPacket::new("kept", Some("tts"))),
    );

    assert_eq!(settle(&session, 1).await, vec!["kept".to_string()]);
}

#[tokio::test]
async fn test_burst_of_events_is_serialized() {
    let (room, session) = setup(AgentRoom::new("room-1", "agent"));
    session
        .say_delay_ms
        .store(5, std::sync::atomic::Ordering::SeqCst);

    for i in 0..5 {
        room.emit(
            DATA_RECEIVED_EVENT,
            InboundEvent::new()
                .with_topic("tts")
                .with_data(format!("burst {}", i)),
        );
    }

    assert_eq!(settle(&session, 5).await.len(), 5);
    assert_eq!(session.max_in_flight(), 1);
}

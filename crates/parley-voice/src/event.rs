//! Extraction of sender text from inbound room events.
//!
//! Data-channel events are resolved by an ordered list of matchers, one per
//! known event shape. The first matcher that yields a payload wins; the topic
//! comes from the keyword field, then from the matched shape, then from the
//! legacy fourth positional argument.

use crate::error::VoiceError;
use crate::payload::normalize;
use parley_types::{EventArg, InboundEvent, Payload, TTS_TOPIC};

/// Event shapes the adapter understands, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventShape {
    /// Keyword `packet` object, or keyword `data`.
    KeywordPacket,
    /// First positional argument is a packet object.
    PositionalObject,
    /// First positional argument is the raw text or bytes.
    PositionalLiteral,
    /// Topic carried as the fourth positional argument.
    LegacyFourArg,
}

struct DataMatch {
    data: Payload,
    topic: Option<String>,
}

type DataMatcher = fn(&InboundEvent) -> Option<DataMatch>;

const DATA_MATCHERS: [(EventShape, DataMatcher); 3] = [
    (EventShape::KeywordPacket, match_keyword),
    (EventShape::PositionalObject, match_positional_object),
    (EventShape::PositionalLiteral, match_positional_literal),
];

fn match_keyword(event: &InboundEvent) -> Option<DataMatch> {
    if let Some(packet) = &event.packet {
        if let Some(data) = &packet.data {
            return Some(DataMatch {
                data: data.clone(),
                topic: packet.topic.clone(),
            });
        }
    }
    event.data.as_ref().map(|data| DataMatch {
        data: data.clone(),
        topic: None,
    })
}

fn match_positional_object(event: &InboundEvent) -> Option<DataMatch> {
    match event.args.first() {
        Some(EventArg::Packet(packet)) => packet.data.as_ref().map(|data| DataMatch {
            data: data.clone(),
            topic: packet.topic.clone(),
        }),
        _ => None,
    }
}

fn match_positional_literal(event: &InboundEvent) -> Option<DataMatch> {
    match event.args.first() {
        Some(EventArg::Text(text)) => Some(DataMatch {
            data: Payload::Text(text.clone()),
            topic: None,
        }),
        Some(EventArg::Bytes(bytes)) => Some(DataMatch {
            data: Payload::Bytes(bytes.clone()),
            topic: None,
        }),
        _ => None,
    }
}

fn match_legacy_topic(event: &InboundEvent) -> Option<String> {
    match event.args.get(3) {
        Some(EventArg::Text(topic)) => Some(topic.clone()),
        _ => None,
    }
}

/// Payload and topic resolved from a data-channel event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub topic: Option<String>,
    pub data: Option<Payload>,
    pub shape: Option<EventShape>,
}

/// Resolves the topic and raw payload of a data-channel event.
pub fn extract_topic_and_data(event: &InboundEvent) -> Resolved {
    let keyword_topic = event.topic.clone().filter(|t| !t.is_empty());

    let matched = DATA_MATCHERS
        .iter()
        .find_map(|(shape, matcher)| matcher(event).map(|m| (*shape, m)));

    let (shape, data, hinted_topic) = match matched {
        Some((shape, m)) => (Some(shape), Some(m.data), m.topic),
        None => (None, None, None),
    };

    let mut topic = keyword_topic.or(hinted_topic);
    let mut shape = shape;
    if topic.is_none() {
        if let Some(legacy) = match_legacy_topic(event) {
            topic = Some(legacy);
            shape = shape.or(Some(EventShape::LegacyFourArg));
        }
    }

    Resolved { topic, data, shape }
}

/// Extracts text from a text-stream event.
///
/// The keyword `text` wins; otherwise each positional argument is tried in
/// order as a plain string, then a record's `text`, then a record's `message`.
pub fn extract_text(event: &InboundEvent) -> Option<String> {
    if let Some(text) = &event.text {
        return Some(text.clone());
    }
    event.args.iter().find_map(|arg| match arg {
        EventArg::Text(text) => Some(text.clone()),
        EventArg::Record(record) => record.text.clone().or_else(|| record.message.clone()),
        _ => None,
    })
}

/// A data-channel message that passed the topic/command filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMessage {
    pub text: String,
    pub explicit: bool,
    pub topic: Option<String>,
}

/// Applies the speech filter to a data-channel event.
///
/// Plain text must arrive on the `tts` topic; explicit speak directives are
/// accepted on any topic.
pub fn accept_data_event(event: &InboundEvent) -> Result<DataMessage, VoiceError> {
    let resolved = extract_topic_and_data(event);
    let data = resolved
        .data
        .ok_or_else(|| VoiceError::MalformedPayload("event carries no data".to_string()))?;

    let normalized = normalize(&data);
    let text = normalized
        .text
        .filter(|t| !t.is_empty())
        .ok_or_else(|| VoiceError::MalformedPayload("payload has no text".to_string()))?;

    if resolved.topic.as_deref() != Some(TTS_TOPIC) && !normalized.explicit {
        return Err(VoiceError::Filtered(format!(
            "topic {:?} is not {:?} and message is not a speak command",
            resolved.topic, TTS_TOPIC
        )));
    }

    Ok(DataMessage {
        text,
        explicit: normalized.explicit,
        topic: resolved.topic,
    })
}

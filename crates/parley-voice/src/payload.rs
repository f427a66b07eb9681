//! Decoding of raw data-channel payloads into speakable text.

use parley_types::{Payload, SPEAK_COMMAND_TYPE};
use serde_json::Value;

/// Text extracted from a payload and whether it was an explicit speak directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: Option<String>,
    pub explicit: bool,
}

impl Normalized {
    fn none() -> Self {
        Self {
            text: None,
            explicit: false,
        }
    }

    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            explicit: false,
        }
    }
}

/// Normalizes a raw payload.
///
/// Accepted shapes, in order:
/// - `{"type": "speak", "text": "..."}`: explicit speak directive
/// - `{"text": "..."}`: plain text
/// - `"..."` (a JSON string): plain text
/// - anything that is not JSON: the trimmed payload itself, as plain text
///
/// Invalid UTF-8, blank payloads, and JSON values of any other shape yield no
/// text. This function never fails.
pub fn normalize(payload: &Payload) -> Normalized {
    let raw = match payload {
        Payload::Text(text) => text.as_str(),
        Payload::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => return Normalized::none(),
        },
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Normalized::none();
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => return Normalized::plain(trimmed),
    };

    match value {
        Value::Object(map) => match map.get("text") {
            Some(Value::String(text)) => Normalized {
                text: Some(text.clone()),
                explicit: map.get("type").and_then(Value::as_str) == Some(SPEAK_COMMAND_TYPE),
            },
            _ => Normalized::none(),
        },
        Value::String(text) => Normalized::plain(text),
        _ => Normalized::none(),
    }
}

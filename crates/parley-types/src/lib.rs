//! Shared types and constants for the Parley speech relay.
//!
//! This crate holds the data model that both the agent and the control-plane
//! API agree on: the canonical [`SpeakCommand`], the shape variants of an
//! [`InboundEvent`] delivered by the realtime transport, and the JSON bodies
//! exchanged over HTTP.
//!
//! Nothing in here performs I/O.

pub mod api;
pub mod event;

pub use api::{ConfigResponse, SessionResponse, SpeakRequest, SpeakResponse};
pub use event::{DataPacket, EventArg, InboundEvent, Payload, TextRecord};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of characters a single utterance may contain.
pub const MAX_TEXT_LENGTH: usize = 500;

/// Data-channel topic that marks plain text as eligible for speech.
pub const TTS_TOPIC: &str = "tts";

/// Value of the `type` field that marks a JSON payload as an explicit speak
/// directive.
pub const SPEAK_COMMAND_TYPE: &str = "speak";

/// Reasons raw text cannot become a [`SpeakCommand`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The text is empty or whitespace-only after trimming.
    #[error("text is empty")]
    Empty,

    /// The trimmed text is longer than the configured limit.
    #[error("text is {len} characters long (limit: {limit})")]
    Oversized { len: usize, limit: usize },
}

/// A validated request to speak one utterance.
///
/// The text is always trimmed, non-empty, and no longer than the limit it was
/// built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakCommand {
    text: String,
    explicit: bool,
}

impl SpeakCommand {
    /// Builds a command from raw sender text.
    ///
    /// Length is counted in characters, not bytes.
    pub fn new(raw: &str, explicit: bool, max_len: usize) -> Result<Self, CommandError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(CommandError::Empty);
        }
        let len = text.chars().count();
        if len > max_len {
            return Err(CommandError::Oversized {
                len,
                limit: max_len,
            });
        }
        Ok(Self {
            text: text.to_string(),
            explicit,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the sender tagged this text as a speak directive.
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_keeps_text() {
        let cmd = SpeakCommand::new("  hello there \n", false, MAX_TEXT_LENGTH).unwrap();
        assert_eq!(cmd.text(), "hello there");
        assert!(!cmd.is_explicit());
    }

    #[test]
    fn rejects_whitespace_only() {
        assert_eq!(
            SpeakCommand::new(" \t\n ", true, MAX_TEXT_LENGTH),
            Err(CommandError::Empty)
        );
        assert_eq!(
            SpeakCommand::new("", false, MAX_TEXT_LENGTH),
            Err(CommandError::Empty)
        );
    }

    #[test]
    fn limit_is_inclusive_and_counts_chars() {
        let exact = "a".repeat(MAX_TEXT_LENGTH);
        assert!(SpeakCommand::new(&exact, false, MAX_TEXT_LENGTH).is_ok());

        let over = "a".repeat(MAX_TEXT_LENGTH + 1);
        assert_eq!(
            SpeakCommand::new(&over, false, MAX_TEXT_LENGTH),
            Err(CommandError::Oversized {
                len: MAX_TEXT_LENGTH + 1,
                limit: MAX_TEXT_LENGTH
            })
        );

        // 500 two-byte characters are 1000 bytes but still within the limit.
        let wide = "é".repeat(MAX_TEXT_LENGTH);
        assert!(SpeakCommand::new(&wide, false, MAX_TEXT_LENGTH).is_ok());
    }
}

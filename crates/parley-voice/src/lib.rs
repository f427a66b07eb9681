//! Speech-dispatch core for the Parley relay.
//!
//! Text arrives over a LiveKit room's data channel (or an HTTP fallback) and
//! is spoken by a single speech session, one utterance at a time. The crate
//! is split along that path:
//!
//! - [`payload`] decodes raw message bytes into text and a speak-directive flag.
//! - [`event`] pulls text and topic out of room events of varying shape and
//!   applies the topic/command filter.
//! - [`speech`] serializes speak requests into interrupt-then-speak calls
//!   against the [`SpeechSession`].
//! - [`avatar`] starts the avatar stream with bounded retry before any speech
//!   is taken.
//!
//! [`room`], [`tts`], [`tavus`], and [`service`] hold the concrete LiveKit,
//! OpenAI, and Tavus integrations.

pub mod avatar;
pub mod config;
pub mod error;
pub mod event;
pub mod payload;
pub mod room;
pub mod service;
pub mod speech;
pub mod tavus;
pub mod tts;

pub use avatar::{AvatarBinding, AvatarBootstrapper, AvatarClient, AvatarSession};
pub use config::{AvatarConfig, LiveKitConfig, OpenAiTtsConfig};
pub use error::{SessionError, VoiceError};
pub use event::{accept_data_event, extract_text, extract_topic_and_data, DataMessage, EventShape};
pub use payload::{normalize, Normalized};
pub use room::{attach_room_handlers, AgentRoom, AudioSink, EventHandler, RoomEvents};
pub use service::{mint_join_token, mint_worker_token, RoomGateway, VoiceService};
pub use speech::{SayOptions, SpeakOutcome, SpeechSerializer, SpeechSession, SpeechState};
pub use tavus::TavusAvatarClient;
pub use tts::OpenAiSpeechSession;

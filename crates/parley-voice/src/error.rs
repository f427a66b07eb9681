use thiserror::Error;

/// Failures reported by a speech session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session does not accept an optional parameter of the call.
    #[error("unsupported option: {0}")]
    UnsupportedOption(String),

    #[error("speech session has not been started")]
    NotStarted,

    #[error("speech session failure: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("LiveKit API error: {0}")]
    LiveKit(#[from] livekit_api::access_token::AccessTokenError),

    #[error("Worker token error: {0}")]
    WorkerToken(#[from] jsonwebtoken::errors::Error),

    #[error("Room service error: {0}")]
    RoomService(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Event filtered: {0}")]
    Filtered(String),

    #[error("Text too long: {len} characters (limit: {limit})")]
    OversizedText { len: usize, limit: usize },

    #[error("Failed to interrupt current utterance: {0}")]
    Interrupt(SessionError),

    #[error("Failed to issue utterance: {0}")]
    SpeakIssue(SessionError),

    #[error("Avatar start failed: {0}")]
    Avatar(String),

    #[error("Avatar start failed after {attempts} attempts: {source}")]
    AvatarStart {
        attempts: u32,
        #[source]
        source: Box<VoiceError>,
    },

    #[error("Event subscription error: {0}")]
    Subscription(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

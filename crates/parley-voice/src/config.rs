use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TTS_MODEL: &str = "gpt-4o-mini-tts";
pub const DEFAULT_TTS_VOICE: &str = "ash";

pub const DEFAULT_TAVUS_API_URL: &str = "https://tavusapi.com";
pub const DEFAULT_AVATAR_PARTICIPANT_NAME: &str = "Tavus-avatar";
pub const DEFAULT_AVATAR_PARTICIPANT_IDENTITY: &str = "tavus-avatar";

fn default_token_ttl_seconds() -> u64 {
    3600
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_tts_model() -> String {
    DEFAULT_TTS_MODEL.to_string()
}

fn default_tts_voice() -> String {
    DEFAULT_TTS_VOICE.to_string()
}

fn default_tavus_api_url() -> String {
    DEFAULT_TAVUS_API_URL.to_string()
}

fn default_participant_name() -> String {
    DEFAULT_AVATAR_PARTICIPANT_NAME.to_string()
}

fn default_participant_identity() -> String {
    DEFAULT_AVATAR_PARTICIPANT_IDENTITY.to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LiveKitConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing, default)]
    pub api_secret: String,
    /// JWT token TTL in seconds for LiveKit join tokens. Default: 3600 (1 hour).
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

impl fmt::Debug for LiveKitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveKitConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

impl LiveKitConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

/// OpenAI text-to-speech settings used by the agent's speech session.
#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiTtsConfig {
    #[serde(skip_serializing, default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_tts_model")]
    pub model: String,
    #[serde(default = "default_tts_voice")]
    pub voice: String,
}

impl Default for OpenAiTtsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            model: default_tts_model(),
            voice: default_tts_voice(),
        }
    }
}

impl fmt::Debug for OpenAiTtsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiTtsConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .finish()
    }
}

/// Avatar (Tavus) settings and the startup retry policy.
#[derive(Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    #[serde(skip_serializing, default)]
    pub api_key: String,
    #[serde(default)]
    pub replica_id: String,
    #[serde(default)]
    pub persona_id: String,
    #[serde(default = "default_tavus_api_url")]
    pub api_url: String,
    #[serde(default = "default_participant_name")]
    pub participant_name: String,
    #[serde(default = "default_participant_identity")]
    pub participant_identity: String,
    /// Total start attempts before giving up. Default: 3.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure. Default: 500.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            replica_id: String::new(),
            persona_id: String::new(),
            api_url: default_tavus_api_url(),
            participant_name: default_participant_name(),
            participant_identity: default_participant_identity(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

impl fmt::Debug for AvatarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarConfig")
            .field("api_key", &"[REDACTED]")
            .field("replica_id", &self.replica_id)
            .field("persona_id", &self.persona_id)
            .field("api_url", &self.api_url)
            .field("participant_name", &self.participant_name)
            .field("participant_identity", &self.participant_identity)
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff_ms", &self.initial_backoff_ms)
            .finish()
    }
}

impl AvatarConfig {
    pub fn new(
        api_key: impl Into<String>,
        replica_id: impl Into<String>,
        persona_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            replica_id: replica_id.into(),
            persona_id: persona_id.into(),
            ..Self::default()
        }
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

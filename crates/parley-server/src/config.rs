//! Configuration loading from file, `.env`, and environment variables.

use parley_types::{ConfigResponse, MAX_TEXT_LENGTH};
use parley_voice::{AvatarConfig, LiveKitConfig, OpenAiTtsConfig};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level configuration shared by the control-plane server and the agent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Control-plane HTTP settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Agent process settings.
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub livekit: LiveKitConfig,

    /// OpenAI text-to-speech, used by the agent only.
    #[serde(default)]
    pub tts: OpenAiTtsConfig,

    /// Tavus avatar, required by the agent and reported by the server.
    #[serde(default)]
    pub avatar: AvatarConfig,

    #[serde(default)]
    pub speech: SpeechConfig,
}

/// Network configuration for the control-plane HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Settings for the per-room agent process.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name the agent is dispatched under.
    #[serde(default)]
    pub name: String,

    /// Seconds between keepalive pings on the worker connection.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Participant identity of the agent in the room.
    #[serde(default = "default_agent_identity")]
    pub identity: String,

    /// Host for the local `/speak` fallback.
    #[serde(default = "default_host")]
    pub http_host: IpAddr,

    /// Port for the local `/speak` fallback.
    #[serde(default = "default_agent_http_port")]
    pub http_port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "parley_voice=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Speech dispatch settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    /// Longest accepted utterance, in characters.
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// TTS model requested on every `say`, if any.
    #[serde(default)]
    pub tts_model_override: Option<String>,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_ping_interval_secs() -> u64 {
    10
}

fn default_agent_identity() -> String {
    "parley-agent".to_string()
}

fn default_agent_http_port() -> u16 {
    8081
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_text_length() -> usize {
    MAX_TEXT_LENGTH
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            ping_interval_secs: default_ping_interval_secs(),
            identity: default_agent_identity(),
            http_host: default_host(),
            http_port: default_agent_http_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            max_text_length: default_max_text_length(),
            tts_model_override: None,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required setting is absent.
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

impl Config {
    /// Checks the settings the control-plane server cannot run without.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` naming the first absent variable.
    pub fn validate_for_api(&self) -> Result<(), ConfigError> {
        require("LIVEKIT_URL", &self.livekit.url)?;
        require("LIVEKIT_API_KEY", &self.livekit.api_key)?;
        require("LIVEKIT_API_SECRET", &self.livekit.api_secret)?;
        require("AGENT_NAME", &self.agent.name)
    }

    /// Checks the settings the agent cannot run without: everything the
    /// server needs plus the OpenAI and Tavus credentials.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` naming the first absent variable.
    pub fn validate_for_agent(&self) -> Result<(), ConfigError> {
        self.validate_for_api()?;
        require("OPENAI_API_KEY", &self.tts.api_key)?;
        require("TAVUS_API_KEY", &self.avatar.api_key)?;
        require("TAVUS_REPLICA_ID", &self.avatar.replica_id)?;
        require("TAVUS_PERSONA_ID", &self.avatar.persona_id)
    }

    /// Which settings are present. Values are never exposed.
    pub fn presence(&self) -> ConfigResponse {
        ConfigResponse {
            livekit_url_present: !self.livekit.url.is_empty(),
            livekit_api_key_present: !self.livekit.api_key.is_empty(),
            livekit_api_secret_present: !self.livekit.api_secret.is_empty(),
            agent_name_present: !self.agent.name.is_empty(),
            tavus_key_present: !self.avatar.api_key.is_empty(),
            tavus_replica_id_present: !self.avatar.replica_id.is_empty(),
            tavus_persona_id_present: !self.avatar.persona_id.is_empty(),
        }
    }
}

fn require(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(())
}

/// Loads configuration from a TOML file and the process environment.
///
/// A `.env` file in the working directory, if any, is loaded into the
/// environment first; variables already set take precedence over it.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    if let Ok(env_file) = dotenvy::dotenv() {
        tracing::debug!(path = %env_file.display(), "loaded .env file");
    }
    load_config_with(path, |name| std::env::var(name).ok())
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies overrides read through `lookup`.
///
/// Overrides (empty values are ignored):
/// - `LIVEKIT_URL`, `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET` override `livekit.*`
/// - `AGENT_NAME` overrides `agent.name`
/// - `OPENAI_API_KEY`, `OPENAI_TTS_MODEL`, `OPENAI_TTS_VOICE` override `tts.*`
/// - `TAVUS_API_KEY`, `TAVUS_REPLICA_ID`, `TAVUS_PERSONA_ID` override `avatar.*`
/// - `PARLEY_HOST`, `PARLEY_PORT` override `server.host` and `server.port`
/// - `PARLEY_AGENT_PORT` overrides `agent.http_port`
/// - `PARLEY_TTS_MODEL_OVERRIDE` overrides `speech.tts_model_override`
/// - `PARLEY_LOG_LEVEL` overrides `logging.level`
/// - `PARLEY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config_with<F>(path: Option<&str>, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(url) = var("LIVEKIT_URL") {
        config.livekit.url = url;
    }
    if let Some(key) = var("LIVEKIT_API_KEY") {
        config.livekit.api_key = key;
    }
    if let Some(secret) = var("LIVEKIT_API_SECRET") {
        config.livekit.api_secret = secret;
    }
    if let Some(name) = var("AGENT_NAME") {
        config.agent.name = name;
    }

    if let Some(key) = var("OPENAI_API_KEY") {
        config.tts.api_key = key;
    }
    if let Some(model) = var("OPENAI_TTS_MODEL") {
        config.tts.model = model;
    }
    if let Some(voice) = var("OPENAI_TTS_VOICE") {
        config.tts.voice = voice;
    }

    if let Some(key) = var("TAVUS_API_KEY") {
        config.avatar.api_key = key;
    }
    if let Some(replica) = var("TAVUS_REPLICA_ID") {
        config.avatar.replica_id = replica;
    }
    if let Some(persona) = var("TAVUS_PERSONA_ID") {
        config.avatar.persona_id = persona;
    }

    if let Some(host) = var("PARLEY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
            config.agent.http_host = parsed;
        }
    }
    if let Some(port) = var("PARLEY_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(port) = var("PARLEY_AGENT_PORT") {
        if let Ok(parsed) = port.parse() {
            config.agent.http_port = parsed;
        }
    }
    if let Some(model) = var("PARLEY_TTS_MODEL_OVERRIDE") {
        config.speech.tts_model_override = Some(model);
    }
    if let Some(level) = var("PARLEY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("PARLEY_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}

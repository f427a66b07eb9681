use crate::config::LiveKitConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use livekit_api::access_token::{AccessToken, VideoGrants};
use livekit_api::services::agent_dispatch::AgentDispatchClient;
use livekit_api::services::room::{RoomClient, SendDataOptions};
use livekit_protocol::CreateAgentDispatchRequest;
use jsonwebtoken::{encode, EncodingKey, Header};
use parley_types::TTS_TOPIC;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::runtime::Handle;
use tracing::info;

/// Converts a `ws://`/`wss://` LiveKit URL into the HTTP(S) URL the server
/// API expects.
pub fn api_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else {
        url.to_string()
    }
}

/// Mints a room join token that may publish, subscribe, and send data.
pub fn mint_join_token(
    config: &LiveKitConfig,
    room_name: &str,
    participant_identity: &str,
    participant_name: &str,
) -> Result<String, VoiceError> {
    let token = AccessToken::with_api_key(&config.api_key, &config.api_secret)
        .with_identity(participant_identity)
        .with_name(participant_name)
        .with_grants(VideoGrants {
            room_join: true,
            room: room_name.to_string(),
            can_publish: true,
            can_subscribe: true,
            can_publish_data: true,
            ..Default::default()
        })
        .with_ttl(Duration::from_secs(config.token_ttl_seconds));

    token.to_jwt().map_err(VoiceError::LiveKit)
}

#[derive(Serialize)]
struct WorkerGrants {
    agent: bool,
}

#[derive(Serialize)]
struct WorkerClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    nbf: u64,
    exp: u64,
    video: WorkerGrants,
}

/// Mints the token an agent worker presents when registering with LiveKit.
///
/// `AccessToken` has no agent grant, so the claims are signed directly.
pub fn mint_worker_token(config: &LiveKitConfig, identity: &str) -> Result<String, VoiceError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| VoiceError::Config(format!("system clock before epoch: {}", e)))?
        .as_secs();
    let claims = WorkerClaims {
        iss: &config.api_key,
        sub: identity,
        nbf: now,
        exp: now + config.token_ttl_seconds,
        video: WorkerGrants { agent: true },
    };
    let key = EncodingKey::from_secret(config.api_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// Control-plane operations on rooms.
#[async_trait]
pub trait RoomGateway: Send + Sync {
    /// Browser-facing LiveKit URL.
    fn livekit_url(&self) -> &str;

    fn mint_token(&self, room_name: &str, identity: &str) -> Result<String, VoiceError>;

    /// Asks LiveKit to dispatch the configured agent into `room_name`.
    async fn dispatch_agent(&self, room_name: &str) -> Result<(), VoiceError>;

    /// Sends `text` to every participant of `room_name` on the `tts` topic.
    async fn send_text(&self, room_name: &str, text: &str) -> Result<(), VoiceError>;
}

/// LiveKit server API client.
pub struct VoiceService {
    config: LiveKitConfig,
    agent_name: String,
    room_client: Arc<RoomClient>,
    dispatch_client: AgentDispatchClient,
}

impl std::fmt::Debug for VoiceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceService")
            .field("config", &self.config)
            .field("agent_name", &self.agent_name)
            .finish_non_exhaustive()
    }
}

impl VoiceService {
    pub fn new(config: LiveKitConfig, agent_name: impl Into<String>) -> Self {
        let host = api_url(&config.url);
        let room_client = Arc::new(RoomClient::with_api_key(
            &host,
            &config.api_key,
            &config.api_secret,
        ));
        let dispatch_client =
            AgentDispatchClient::with_api_key(&host, &config.api_key, &config.api_secret);
        Self {
            config,
            agent_name: agent_name.into(),
            room_client,
            dispatch_client,
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }
}

#[async_trait]
impl RoomGateway for VoiceService {
    fn livekit_url(&self) -> &str {
        &self.config.url
    }

    fn mint_token(&self, room_name: &str, identity: &str) -> Result<String, VoiceError> {
        mint_join_token(&self.config, room_name, identity, identity)
    }

    async fn dispatch_agent(&self, room_name: &str) -> Result<(), VoiceError> {
        let request = CreateAgentDispatchRequest {
            agent_name: self.agent_name.clone(),
            room: room_name.to_string(),
            ..Default::default()
        };
        self.dispatch_client
            .create_dispatch(request)
            .await
            .map_err(|e| VoiceError::RoomService(e.to_string()))?;

        info!(agent = %self.agent_name, room = room_name, "dispatched agent");
        Ok(())
    }

    async fn send_text(&self, room_name: &str, text: &str) -> Result<(), VoiceError> {
        // Default kind is reliable delivery.
        let options = SendDataOptions {
            topic: Some(TTS_TOPIC.to_string()),
            ..Default::default()
        };
        // The `send_data` future is not `Send`, so it runs to completion on a
        // blocking thread instead of inside this handler's future.
        let client = Arc::clone(&self.room_client);
        let room = room_name.to_string();
        let data = text.as_bytes().to_vec();
        let runtime = Handle::current();
        tokio::task::spawn_blocking(move || {
            runtime.block_on(client.send_data(&room, data, options))
        })
        .await
        .map_err(|e| VoiceError::RoomService(format!("send task failed: {}", e)))?
        .map_err(|e| VoiceError::RoomService(e.to_string()))?;

        info!(room = room_name, bytes = text.len(), "sent data packet to room");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_urls_map_to_http() {
        assert_eq!(api_url("wss://demo.livekit.cloud"), "https://demo.livekit.cloud");
        assert_eq!(api_url("ws://localhost:7880"), "http://localhost:7880");
        assert_eq!(api_url("http://localhost:7880"), "http://localhost:7880");
    }
}

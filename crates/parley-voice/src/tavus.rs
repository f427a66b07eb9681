use crate::avatar::{AvatarBinding, AvatarClient, AvatarSession};
use crate::config::LiveKitConfig;
use crate::error::VoiceError;
use crate::service::mint_join_token;
use crate::speech::SpeechSession;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Timeout for the conversation-create request.
const CREATE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct ConversationProperties<'a> {
    livekit_ws_url: &'a str,
    livekit_room_token: &'a str,
}

#[derive(Serialize)]
struct CreateConversationRequest<'a> {
    replica_id: &'a str,
    persona_id: &'a str,
    properties: ConversationProperties<'a>,
}

#[derive(Deserialize)]
struct CreateConversationResponse {
    conversation_id: String,
}

/// Avatar client for Tavus.
///
/// Each start mints a join token for the avatar participant, asks Tavus to
/// join the room with it, and routes the speech session's audio to the avatar.
#[derive(Debug, Clone)]
pub struct TavusAvatarClient {
    http: reqwest::Client,
    api_url: String,
}

impl TavusAvatarClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl AvatarClient for TavusAvatarClient {
    async fn start(
        &self,
        binding: AvatarBinding,
        session: &dyn SpeechSession,
        room_name: &str,
        params: &LiveKitConfig,
    ) -> Result<AvatarSession, VoiceError> {
        if binding.replica_id.is_empty() || binding.api_key.is_empty() {
            return Err(VoiceError::Config(
                "Tavus API key and replica id are required".to_string(),
            ));
        }

        let token = mint_join_token(
            params,
            room_name,
            &binding.participant_identity,
            &binding.participant_name,
        )?;

        let url = format!("{}/v2/conversations", self.api_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &binding.api_key)
            .timeout(CREATE_TIMEOUT)
            .json(&CreateConversationRequest {
                replica_id: &binding.replica_id,
                persona_id: &binding.persona_id,
                properties: ConversationProperties {
                    livekit_ws_url: &params.url,
                    livekit_room_token: &token,
                },
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Avatar(format!(
                "Tavus returned {}: {}",
                status, body
            )));
        }

        let created: CreateConversationResponse = response.json().await?;
        info!(
            conversation_id = %created.conversation_id,
            room = room_name,
            "tavus conversation created"
        );

        session.route_audio_to(&binding.participant_identity);

        Ok(AvatarSession {
            conversation_id: created.conversation_id,
            participant_identity: binding.participant_identity,
            participant_name: binding.participant_name,
            room_name: room_name.to_string(),
        })
    }
}

//! Avatar session startup with bounded retry.

use crate::config::{AvatarConfig, LiveKitConfig};
use crate::error::VoiceError;
use crate::speech::SpeechSession;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Identifiers and credentials for one avatar start attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct AvatarBinding {
    pub replica_id: String,
    pub persona_id: String,
    pub api_key: String,
    pub participant_name: String,
    pub participant_identity: String,
}

impl fmt::Debug for AvatarBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarBinding")
            .field("replica_id", &self.replica_id)
            .field("persona_id", &self.persona_id)
            .field("api_key", &"[REDACTED]")
            .field("participant_name", &self.participant_name)
            .field("participant_identity", &self.participant_identity)
            .finish()
    }
}

impl From<&AvatarConfig> for AvatarBinding {
    fn from(config: &AvatarConfig) -> Self {
        Self {
            replica_id: config.replica_id.clone(),
            persona_id: config.persona_id.clone(),
            api_key: config.api_key.clone(),
            participant_name: config.participant_name.clone(),
            participant_identity: config.participant_identity.clone(),
        }
    }
}

/// A running avatar stream bound to a room and speech session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarSession {
    pub conversation_id: String,
    pub participant_identity: String,
    pub participant_name: String,
    pub room_name: String,
}

/// The external avatar provider.
#[async_trait]
pub trait AvatarClient: Send + Sync {
    /// Starts an avatar in `room_name` that renders `session`'s speech.
    async fn start(
        &self,
        binding: AvatarBinding,
        session: &dyn SpeechSession,
        room_name: &str,
        params: &LiveKitConfig,
    ) -> Result<AvatarSession, VoiceError>;
}

/// Starts the avatar once per job, retrying with exponential backoff.
///
/// Must finish before the speech session starts taking traffic: speech is
/// routed through the avatar's tracks.
pub struct AvatarBootstrapper {
    client: Arc<dyn AvatarClient>,
    config: AvatarConfig,
    livekit: LiveKitConfig,
}

impl AvatarBootstrapper {
    pub fn new(client: Arc<dyn AvatarClient>, config: AvatarConfig, livekit: LiveKitConfig) -> Self {
        Self {
            client,
            config,
            livekit,
        }
    }

    /// Starts the avatar, trying up to `max_attempts` times.
    ///
    /// The delay starts at `initial_backoff_ms` and doubles after every failed
    /// attempt; there is no delay after the last one.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceError::AvatarStart`] wrapping the last failure once all
    /// attempts are used up.
    pub async fn start(
        &self,
        session: &dyn SpeechSession,
        room_name: &str,
    ) -> Result<AvatarSession, VoiceError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut delay = self.config.initial_backoff();
        let mut attempt = 1;

        loop {
            let binding = AvatarBinding::from(&self.config);
            match self
                .client
                .start(binding, session, room_name, &self.livekit)
                .await
            {
                Ok(avatar) => {
                    info!(
                        participant = %avatar.participant_name,
                        room = room_name,
                        attempt,
                        "avatar started"
                    );
                    return Ok(avatar);
                }
                Err(e) => {
                    error!(attempt, room = room_name, "avatar start failed: {}", e);
                    if attempt >= max_attempts {
                        return Err(VoiceError::AvatarStart {
                            attempts: attempt,
                            source: Box::new(e),
                        });
                    }
                    warn!(
                        delay_ms = delay.as_millis() as u64,
                        next_attempt = attempt + 1,
                        "retrying avatar start"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }
}

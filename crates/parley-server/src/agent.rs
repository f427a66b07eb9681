//! The per-room agent job and its local HTTP fallback.

use crate::api::{self, ApiError};
use crate::config::Config;
use crate::MAX_REQUEST_BODY_BYTES;
use axum::{
    extract::{DefaultBodyLimit, Extension, Json},
    routing::{get, post},
    Router,
};
use parley_types::{SpeakRequest, SpeakResponse};
use parley_voice::{
    attach_room_handlers, AgentRoom, AvatarBootstrapper, AvatarClient, AvatarSession,
    SpeechSerializer, SpeechSession, VoiceError,
};
use std::sync::{Arc, RwLock};
use tower_http::trace::TraceLayer;
use tracing::info;

/// A running agent: avatar bound, speech session started, room handlers
/// attached.
pub struct AgentJob {
    room: Arc<AgentRoom>,
    serializer: Arc<SpeechSerializer>,
    avatar: AvatarSession,
}

impl AgentJob {
    /// Brings the agent up in `room`.
    ///
    /// The avatar is started first, with retry; the speech session is started
    /// and room traffic accepted only once it is up.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceError::AvatarStart`] if the avatar never started. The
    /// session is left unstarted and no handlers are attached.
    pub async fn start(
        config: &Config,
        room: Arc<AgentRoom>,
        session: Arc<dyn SpeechSession>,
        avatar_client: Arc<dyn AvatarClient>,
    ) -> Result<Self, VoiceError> {
        info!(room = room.name(), identity = room.local_identity(), "connected");

        let bootstrapper =
            AvatarBootstrapper::new(avatar_client, config.avatar.clone(), config.livekit.clone());
        let avatar = bootstrapper.start(session.as_ref(), room.name()).await?;

        session.start();

        let serializer = Arc::new(
            SpeechSerializer::new(session)
                .with_tts_model(config.speech.tts_model_override.clone())
                .with_max_text_length(config.speech.max_text_length),
        );
        attach_room_handlers(room.as_ref(), Arc::clone(&serializer));

        Ok(Self {
            room,
            serializer,
            avatar,
        })
    }

    pub fn serializer(&self) -> Arc<SpeechSerializer> {
        Arc::clone(&self.serializer)
    }

    pub fn avatar(&self) -> &AvatarSession {
        &self.avatar
    }

    pub fn room(&self) -> Arc<AgentRoom> {
        Arc::clone(&self.room)
    }

    /// Resolves when the room disconnects.
    pub async fn run_until_disconnect(&self) {
        self.room.wait_for_disconnect().await;
        info!(room = self.room.name(), "room disconnected, agent job finished");
    }
}

/// The serializer `/speak` feeds: the active job's, once one is running.
#[derive(Clone, Default)]
pub struct SpeakTarget {
    current: Arc<RwLock<Option<Arc<SpeechSerializer>>>>,
}

impl SpeakTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, serializer: Arc<SpeechSerializer>) {
        match self.current.write() {
            Ok(mut slot) => *slot = Some(serializer),
            Err(poisoned) => *poisoned.into_inner() = Some(serializer),
        }
    }

    /// Clears the target if it is still `serializer`.
    pub fn clear(&self, serializer: &Arc<SpeechSerializer>) {
        let mut slot = match self.current.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, serializer)) {
            *slot = None;
        }
    }

    pub fn current(&self) -> Option<Arc<SpeechSerializer>> {
        match self.current.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl From<Arc<SpeechSerializer>> for SpeakTarget {
    fn from(serializer: Arc<SpeechSerializer>) -> Self {
        let target = Self::new();
        target.set(serializer);
        target
    }
}

async fn speak_handler(
    Extension(target): Extension<SpeakTarget>,
    Json(payload): Json<SpeakRequest>,
) -> Result<Json<SpeakResponse>, ApiError> {
    let serializer = target
        .current()
        .ok_or_else(|| ApiError::ServiceUnavailable("agent is not in a room".to_string()))?;
    api::validate_speak_text(&payload.text, serializer.max_text_length())?;
    serializer.spawn_speak(payload.text);
    Ok(Json(SpeakResponse { ok: true }))
}

/// Router for the agent's local HTTP fallback: `GET /health` and
/// `POST /speak`. `/speak` feeds the same serializer as the active job's
/// room handlers.
pub fn agent_app(target: SpeakTarget) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/speak", post(speak_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(target))
}

//! API handlers for the control-plane server.

use crate::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parley_types::{ConfigResponse, SessionResponse, SpeakRequest, SpeakResponse};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Checks that `text` is 1..=`max_len` characters, as sent.
pub fn validate_speak_text(text: &str, max_len: usize) -> Result<(), ApiError> {
    let len = text.chars().count();
    if len == 0 {
        return Err(ApiError::Validation("text must not be empty".to_string()));
    }
    if len > max_len {
        return Err(ApiError::Validation(format!(
            "text is {} characters, limit is {}",
            len, max_len
        )));
    }
    Ok(())
}

/// Health check handler.
pub async fn health() -> Json<Value> {
    Json(json!({
        "ok": true,
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Handler for `GET /config`.
pub async fn config_handler(Extension(state): Extension<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(state.presence.clone())
}

fn short_id(len: usize) -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(len);
    id
}

/// Handler for `POST /session`.
///
/// Creates a fresh room, dispatches the agent into it, and returns a join
/// token for a new browser participant.
pub async fn create_session_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let room_name = format!("room-{}", short_id(10));
    let identity = format!("user-{}", short_id(12));

    if let Err(e) = state.gateway.dispatch_agent(&room_name).await {
        tracing::error!(room = %room_name, "failed to dispatch agent: {}", e);
        return Err(ApiError::InternalServerError(
            "Failed to dispatch agent".to_string(),
        ));
    }

    let token = state
        .gateway
        .mint_token(&room_name, &identity)
        .map_err(|e| {
            tracing::error!(room = %room_name, "failed to mint join token: {}", e);
            ApiError::InternalServerError("Failed to mint join token".to_string())
        })?;

    tracing::info!(room = %room_name, %identity, "session created");

    Ok(Json(SessionResponse {
        room_name,
        livekit_url: state.gateway.livekit_url().to_string(),
        token,
    }))
}

/// Handler for `POST /rooms/{room_name}/speak`.
///
/// Publishes the text to the room on the `tts` topic for the agent to speak.
pub async fn room_speak_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(room_name): Path<String>,
    Json(payload): Json<SpeakRequest>,
) -> Result<Json<SpeakResponse>, ApiError> {
    if room_name.trim().is_empty() {
        return Err(ApiError::BadRequest("room name must not be empty".to_string()));
    }
    validate_speak_text(&payload.text, state.max_text_length)?;

    if let Err(e) = state.gateway.send_text(&room_name, &payload.text).await {
        tracing::error!(room = %room_name, "failed to send speak text: {}", e);
        return Err(ApiError::InternalServerError(
            "Failed to send speak text".to_string(),
        ));
    }

    Ok(Json(SpeakResponse { ok: true }))
}

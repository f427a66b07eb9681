//! Parley control-plane server and agent library logic.

pub mod agent;
pub mod api;
pub mod config;
#[cfg(feature = "rtc")]
pub mod rtc;
pub mod startup;
pub mod transport;
pub mod worker;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use parley_types::ConfigResponse;
use parley_voice::RoomGateway;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Largest accepted request body. Speak requests are at most a few KiB.
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// LiveKit control plane.
    pub gateway: Arc<dyn RoomGateway>,
    /// Presence flags reported by `GET /config`.
    pub presence: ConfigResponse,
    /// Longest text accepted by `POST /rooms/{room_name}/speak`.
    pub max_text_length: usize,
}

/// Builds the control-plane router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/config", get(api::config_handler))
        .route("/session", post(api::create_session_handler))
        .route("/rooms/{room_name}/speak", post(api::room_speak_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}

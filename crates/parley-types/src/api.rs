//! Request and response bodies for the HTTP surfaces.

use serde::{Deserialize, Serialize};

/// Body of `POST /speak` (agent fallback) and `POST /rooms/{room}/speak`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakResponse {
    pub ok: bool,
}

/// Response body for `POST /session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(rename = "roomName")]
    pub room_name: String,
    #[serde(rename = "livekitUrl")]
    pub livekit_url: String,
    pub token: String,
}

/// Response body for `GET /config`: which settings are present, never their
/// values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub livekit_url_present: bool,
    pub livekit_api_key_present: bool,
    pub livekit_api_secret_present: bool,
    pub agent_name_present: bool,
    pub tavus_key_present: bool,
    pub tavus_replica_id_present: bool,
    pub tavus_persona_id_present: bool,
}

//! LiveKit agent-worker protocol.
//!
//! The agent registers with the LiveKit server over a websocket at
//! `<livekit url>/agent`, exchanging protobuf `WorkerMessage`s and
//! `ServerMessage`s. The server offers jobs, one per room the agent was
//! dispatched into; accepted jobs come back as assignments carrying the room
//! and a join token.

use livekit_protocol::{
    server_message, worker_message, AvailabilityResponse, JobStatus, JobType,
    RegisterWorkerRequest, ServerMessage, UpdateJobStatus, WorkerMessage, WorkerPing,
};
use prost::Message;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const WORKER_PATH: &str = "agent";

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("malformed server message: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Builds the worker websocket URL from a LiveKit server URL.
pub fn worker_url(livekit_url: &str) -> String {
    let base = if let Some(rest) = livekit_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = livekit_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        livekit_url.to_string()
    };
    format!("{}/{}", base.trim_end_matches('/'), WORKER_PATH)
}

/// A job the server assigned to this worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLaunch {
    pub job_id: String,
    pub room_name: String,
    /// Server URL to join, when it differs from the one registered against.
    pub url: Option<String>,
    pub token: String,
}

/// What the worker loop should do with a server message.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerAction {
    Reply(WorkerMessage),
    Launch(JobLaunch),
    Terminate(String),
    Ignore,
}

pub fn register_message(agent_name: &str, ping_interval_secs: u64) -> WorkerMessage {
    WorkerMessage {
        message: Some(worker_message::Message::Register(RegisterWorkerRequest {
            r#type: JobType::JtRoom as i32,
            agent_name: agent_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ping_interval: u32::try_from(ping_interval_secs).unwrap_or(u32::MAX),
            ..Default::default()
        })),
    }
}

pub fn ping_message(timestamp_ms: i64) -> WorkerMessage {
    WorkerMessage {
        message: Some(worker_message::Message::Ping(WorkerPing {
            timestamp: timestamp_ms,
        })),
    }
}

pub fn job_status_message(job_id: &str, status: JobStatus, error: Option<&str>) -> WorkerMessage {
    WorkerMessage {
        message: Some(worker_message::Message::UpdateJob(UpdateJobStatus {
            job_id: job_id.to_string(),
            status: status as i32,
            error: error.unwrap_or_default().to_string(),
        })),
    }
}

pub fn encode(message: &WorkerMessage) -> Vec<u8> {
    message.encode_to_vec()
}

pub fn decode(bytes: &[u8]) -> Result<ServerMessage, WorkerError> {
    Ok(ServerMessage::decode(bytes)?)
}

/// Decides the worker's response to one server message.
///
/// Every offered job is accepted; the agent joins as `participant_identity`.
pub fn handle_server_message(message: ServerMessage, participant_identity: &str) -> WorkerAction {
    let Some(message) = message.message else {
        return WorkerAction::Ignore;
    };

    match message {
        server_message::Message::Register(registered) => {
            info!(worker_id = %registered.worker_id, "registered agent worker");
            WorkerAction::Ignore
        }
        server_message::Message::Availability(request) => {
            let Some(job) = request.job else {
                warn!("availability request without a job");
                return WorkerAction::Ignore;
            };
            debug!(job_id = %job.id, "accepting job offer");
            WorkerAction::Reply(WorkerMessage {
                message: Some(worker_message::Message::Availability(AvailabilityResponse {
                    job_id: job.id,
                    available: true,
                    participant_identity: participant_identity.to_string(),
                    participant_name: participant_identity.to_string(),
                    ..Default::default()
                })),
            })
        }
        server_message::Message::Assignment(assignment) => {
            let Some(job) = assignment.job else {
                warn!("job assignment without a job");
                return WorkerAction::Ignore;
            };
            let Some(room) = job.room.filter(|room| !room.name.is_empty()) else {
                warn!(job_id = %job.id, "job assignment without a room");
                return WorkerAction::Ignore;
            };
            WorkerAction::Launch(JobLaunch {
                job_id: job.id,
                room_name: room.name,
                url: assignment.url.filter(|url| !url.is_empty()),
                token: assignment.token,
            })
        }
        server_message::Message::Termination(termination) => {
            WorkerAction::Terminate(termination.job_id)
        }
        server_message::Message::Pong(_) => WorkerAction::Ignore,
    }
}

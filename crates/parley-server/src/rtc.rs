//! WebRTC transport for the agent.
//!
//! [`run_worker`] registers with LiveKit as an agent worker and runs one
//! [`AgentJob`] per assigned room: it joins the room, publishes a local
//! audio track for synthesized speech, and pumps room events into the job's
//! [`AgentRoom`].

use crate::agent::{AgentJob, SpeakTarget};
use crate::config::Config;
use crate::transport::{chat_event, data_event, pcm_frames, NUM_CHANNELS, SAMPLE_RATE};
use crate::worker::{self, JobLaunch, WorkerAction, WorkerError};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use livekit::options::TrackPublishOptions;
use livekit::prelude::{LocalAudioTrack, LocalTrack, Room, RoomError, RoomEvent, RoomOptions, TrackSource};
use livekit::webrtc::audio_frame::AudioFrame;
use livekit::webrtc::audio_source::native::NativeAudioSource;
use livekit::webrtc::audio_source::{AudioSourceOptions, RtcAudioSource};
use livekit_protocol::JobStatus;
use parley_voice::room::DATA_RECEIVED_EVENT;
use parley_voice::{
    mint_worker_token, AgentRoom, AudioSink, OpenAiSpeechSession, SpeechSession,
    TavusAvatarClient, VoiceError,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, InvalidHeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Event name chat messages are delivered under.
const CHAT_EVENT: &str = "text_received";

/// Audio buffered ahead of playback in the local track, in milliseconds.
const AUDIO_QUEUE_MS: u32 = 1000;

#[derive(Debug, Error)]
pub enum RtcError {
    #[error("worker connection error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid worker token header: {0}")]
    Header(#[from] InvalidHeaderValue),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("room error: {0}")]
    Room(#[from] RoomError),

    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error("worker connection closed by server")]
    Closed,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

/// Registers as an agent worker and runs assigned jobs until `shutdown`
/// resolves or the server closes the connection.
///
/// The active job's serializer is published through `target` for the local
/// `/speak` fallback.
pub async fn run_worker(
    config: Arc<Config>,
    target: SpeakTarget,
    shutdown: impl Future<Output = ()>,
) -> Result<(), RtcError> {
    let token = mint_worker_token(&config.livekit, &config.agent.identity)?;
    let mut request = worker::worker_url(&config.livekit.url).into_client_request()?;
    request
        .headers_mut()
        .insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);

    let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
    let (mut write, mut read) = ws_stream.split();

    let register = worker::register_message(&config.agent.name, config.agent.ping_interval_secs);
    write.send(Message::Binary(worker::encode(&register).into())).await?;
    info!(agent = %config.agent.name, "agent worker connected");

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let mut jobs: HashMap<String, oneshot::Sender<()>> = HashMap::new();
    let mut ping = tokio::time::interval(Duration::from_secs(config.agent.ping_interval_secs.max(1)));
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            () = &mut shutdown => break Ok(()),
            _ = ping.tick() => {
                let message = worker::ping_message(now_ms());
                if let Err(e) = write.send(Message::Binary(worker::encode(&message).into())).await {
                    break Err(e.into());
                }
            }
            Some(message) = outbound_rx.recv() => {
                if let Err(e) = write.send(Message::Binary(worker::encode(&message).into())).await {
                    break Err(e.into());
                }
            }
            frame = read.next() => {
                let bytes = match frame {
                    None | Some(Ok(Message::Close(_))) => break Err(RtcError::Closed),
                    Some(Err(e)) => break Err(e.into()),
                    Some(Ok(Message::Binary(bytes))) => bytes,
                    Some(Ok(_)) => continue,
                };
                let message = match worker::decode(&bytes) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("dropping server message: {}", e);
                        continue;
                    }
                };
                match worker::handle_server_message(message, &config.agent.identity) {
                    WorkerAction::Reply(reply) => {
                        if let Err(e) = write.send(Message::Binary(worker::encode(&reply).into())).await {
                            break Err(e.into());
                        }
                    }
                    WorkerAction::Launch(launch) => {
                        let (stop_tx, stop_rx) = oneshot::channel();
                        jobs.retain(|_, stop| !stop.is_closed());
                        jobs.insert(launch.job_id.clone(), stop_tx);
                        tokio::spawn(run_job(
                            Arc::clone(&config),
                            launch,
                            target.clone(),
                            outbound_tx.clone(),
                            stop_rx,
                        ));
                    }
                    WorkerAction::Terminate(job_id) => {
                        info!(job_id = %job_id, "job terminated by server");
                        if let Some(stop) = jobs.remove(&job_id) {
                            let _ = stop.send(());
                        }
                    }
                    WorkerAction::Ignore => {}
                }
            }
        }
    };

    for (_, stop) in jobs.drain() {
        let _ = stop.send(());
    }
    let _ = write.send(Message::Close(None)).await;
    result
}

/// Plays synthesized PCM through the room's local audio track.
struct TrackOutput {
    source: NativeAudioSource,
}

#[async_trait]
impl AudioSink for TrackOutput {
    async fn publish_audio(&self, destination: Option<&str>, pcm: &[u8]) -> Result<(), VoiceError> {
        debug!(
            bytes = pcm.len(),
            destination = destination.unwrap_or("<room>"),
            "capturing audio frames"
        );
        for samples in pcm_frames(pcm) {
            let samples_per_channel = u32::try_from(samples.len()).unwrap_or(u32::MAX);
            let frame = AudioFrame {
                data: samples.into(),
                sample_rate: SAMPLE_RATE,
                num_channels: NUM_CHANNELS,
                samples_per_channel,
            };
            self.source
                .capture_frame(&frame)
                .await
                .map_err(|e| VoiceError::RoomService(format!("audio capture failed: {}", e)))?;
        }
        Ok(())
    }
}

/// Forwards LiveKit room events to `room` until the connection ends.
async fn pump_events(room: Arc<AgentRoom>, mut events: mpsc::UnboundedReceiver<RoomEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            RoomEvent::DataReceived {
                payload,
                topic,
                participant,
                ..
            } => {
                let event = data_event(&payload, topic.as_deref(), participant.is_some());
                room.emit(DATA_RECEIVED_EVENT, event);
            }
            RoomEvent::ChatMessage { message, .. } => {
                room.emit(CHAT_EVENT, chat_event(&message.message));
            }
            RoomEvent::Disconnected { reason } => {
                info!(room = room.name(), ?reason, "room connection closed");
                break;
            }
            _ => {}
        }
    }
    room.disconnect();
}

async fn run_job(
    config: Arc<Config>,
    launch: JobLaunch,
    target: SpeakTarget,
    outbound: mpsc::UnboundedSender<livekit_protocol::WorkerMessage>,
    stop: oneshot::Receiver<()>,
) {
    let job_id = launch.job_id.clone();
    let status = match join_and_run(&config, launch, &target, stop).await {
        Ok(()) => worker::job_status_message(&job_id, JobStatus::JsSuccess, None),
        Err(e) => {
            error!(job_id = %job_id, "agent job failed: {}", e);
            worker::job_status_message(&job_id, JobStatus::JsFailed, Some(&e.to_string()))
        }
    };
    let _ = outbound.send(status);
}

async fn join_and_run(
    config: &Config,
    launch: JobLaunch,
    target: &SpeakTarget,
    stop: oneshot::Receiver<()>,
) -> Result<(), RtcError> {
    let url = launch.url.as_deref().unwrap_or(&config.livekit.url);
    let (lk_room, events) = Room::connect(url, &launch.token, RoomOptions::default()).await?;
    let identity = lk_room.local_participant().identity().to_string();
    info!(job_id = %launch.job_id, room = %launch.room_name, %identity, "joined room");

    let room = Arc::new(AgentRoom::new(launch.room_name.clone(), identity));
    let pump = tokio::spawn(pump_events(Arc::clone(&room), events));

    let source = NativeAudioSource::new(
        AudioSourceOptions::default(),
        SAMPLE_RATE,
        NUM_CHANNELS,
        AUDIO_QUEUE_MS,
    );
    let track = LocalAudioTrack::create_audio_track(
        "parley-speech",
        RtcAudioSource::Native(source.clone()),
    );
    let published = lk_room
        .local_participant()
        .publish_track(
            LocalTrack::Audio(track),
            TrackPublishOptions {
                source: TrackSource::Microphone,
                ..Default::default()
            },
        )
        .await;
    if let Err(e) = published {
        pump.abort();
        let _ = lk_room.close().await;
        return Err(e.into());
    }
    room.set_audio_output(Arc::new(TrackOutput { source }));

    let sink: Arc<dyn AudioSink> = room.clone();
    let session: Arc<dyn SpeechSession> =
        Arc::new(OpenAiSpeechSession::new(config.tts.clone(), sink));
    let avatar_client = Arc::new(TavusAvatarClient::new(config.avatar.api_url.clone()));

    let job = match AgentJob::start(config, Arc::clone(&room), session, avatar_client).await {
        Ok(job) => job,
        Err(e) => {
            pump.abort();
            let _ = lk_room.close().await;
            return Err(e.into());
        }
    };

    let serializer = job.serializer();
    target.set(Arc::clone(&serializer));
    info!(
        room = room.name(),
        conversation = %job.avatar().conversation_id,
        "listening for room data messages"
    );

    tokio::select! {
        () = job.run_until_disconnect() => {}
        _ = stop => room.disconnect(),
    }

    target.clear(&serializer);
    pump.abort();
    if let Err(e) = lk_room.close().await {
        debug!(room = room.name(), "room close: {}", e);
    }
    Ok(())
}

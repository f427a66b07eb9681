use crate::config::OpenAiTtsConfig;
use crate::error::{SessionError, VoiceError};
use crate::room::AudioSink;
use crate::speech::{SayOptions, SpeechSession};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Timeout for a single synthesis request.
const TTS_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// Synthesizes `text` to raw 24 kHz 16-bit mono PCM via OpenAI's speech endpoint.
pub async fn synthesize(
    http: &reqwest::Client,
    config: &OpenAiTtsConfig,
    text: &str,
    model: &str,
) -> Result<Vec<u8>, VoiceError> {
    let url = format!("{}/audio/speech", config.base_url.trim_end_matches('/'));
    let response = http
        .post(&url)
        .bearer_auth(&config.api_key)
        .timeout(TTS_TIMEOUT)
        .json(&SpeechRequest {
            model,
            voice: &config.voice,
            input: text,
            response_format: "pcm",
        })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(VoiceError::Tts(format!(
            "speech endpoint returned {}: {}",
            status, body
        )));
    }

    Ok(response.bytes().await?.to_vec())
}

/// Speech session backed by OpenAI text-to-speech.
///
/// `say` starts synthesis and playback on a background task and returns
/// immediately; `interrupt` aborts that task.
pub struct OpenAiSpeechSession {
    http: reqwest::Client,
    config: OpenAiTtsConfig,
    sink: Arc<dyn AudioSink>,
    started: AtomicBool,
    destination: RwLock<Option<String>>,
    playback: Mutex<Option<JoinHandle<()>>>,
}

impl OpenAiSpeechSession {
    pub fn new(config: OpenAiTtsConfig, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            sink,
            started: AtomicBool::new(false),
            destination: RwLock::new(None),
            playback: Mutex::new(None),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn destination(&self) -> Option<String> {
        match self.destination.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl SpeechSession for OpenAiSpeechSession {
    async fn interrupt(&self) -> Result<(), SessionError> {
        if let Some(handle) = self.playback.lock().await.take() {
            if !handle.is_finished() {
                debug!("interrupting current utterance");
                handle.abort();
            }
        }
        Ok(())
    }

    async fn say(&self, text: &str, options: SayOptions) -> Result<(), SessionError> {
        if !self.is_started() {
            return Err(SessionError::NotStarted);
        }

        let http = self.http.clone();
        let config = self.config.clone();
        let sink = Arc::clone(&self.sink);
        let destination = self.destination();
        let model = options.tts_model.unwrap_or_else(|| config.model.clone());
        let text = text.to_string();

        let handle = tokio::spawn(async move {
            match synthesize(&http, &config, &text, &model).await {
                Ok(pcm) => {
                    if let Err(e) = sink.publish_audio(destination.as_deref(), &pcm).await {
                        error!("failed to publish utterance audio: {}", e);
                    }
                }
                Err(e) => error!(%model, "speech synthesis failed: {}", e),
            }
        });

        if let Some(previous) = self.playback.lock().await.replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Utterances are refused until this is called.
    fn start(&self) {
        if !self.started.swap(true, Ordering::AcqRel) {
            info!(
                model = %self.config.model,
                voice = %self.config.voice,
                destination = self.destination().as_deref().unwrap_or("<room>"),
                "speech session started"
            );
        }
    }

    fn route_audio_to(&self, participant_identity: &str) {
        let mut guard = match self.destination.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(participant_identity.to_string());
        info!(participant = participant_identity, "routing speech audio to participant");
    }
}

//! Serialized interrupt-then-speak dispatch.

use crate::error::{SessionError, VoiceError};
use async_trait::async_trait;
use parley_types::{CommandError, SpeakCommand, MAX_TEXT_LENGTH};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Optional parameters of a `say` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SayOptions {
    /// TTS model to use for this utterance instead of the session default.
    pub tts_model: Option<String>,
}

/// The external speech session that renders utterances.
#[async_trait]
pub trait SpeechSession: Send + Sync {
    /// Stops the utterance currently playing, if any.
    async fn interrupt(&self) -> Result<(), SessionError>;

    /// Begins a new utterance.
    async fn say(&self, text: &str, options: SayOptions) -> Result<(), SessionError>;

    /// Starts the media pipeline. Called once, after the avatar is up.
    fn start(&self) {}

    /// Sends synthesized audio to the given participant instead of the room.
    fn route_audio_to(&self, _participant_identity: &str) {}
}

/// Whether the last issued utterance was accepted by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    Idle,
    Speaking,
}

/// What became of one `speak` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Blank text; nothing was sent to the session.
    Empty,
    /// Text over the length limit; nothing was sent to the session.
    Oversized,
    /// The utterance was issued.
    Spoken,
    /// The session rejected the utterance. Later requests are unaffected.
    IssueFailed,
}

/// Owns the right to be the current speaker.
///
/// Every accepted request takes the utterance lock, interrupts whatever is
/// playing, and issues its own utterance before releasing the lock, so at most
/// one `say` call is in flight per serializer. Requests are served in lock
/// acquisition order; the last one to acquire the lock is the one left
/// speaking.
pub struct SpeechSerializer {
    session: Arc<dyn SpeechSession>,
    tts_model: Option<String>,
    max_text_length: usize,
    utterance_lock: Mutex<()>,
    speaking: AtomicBool,
}

impl SpeechSerializer {
    pub fn new(session: Arc<dyn SpeechSession>) -> Self {
        Self {
            session,
            tts_model: None,
            max_text_length: MAX_TEXT_LENGTH,
            utterance_lock: Mutex::new(()),
            speaking: AtomicBool::new(false),
        }
    }

    /// Requests a specific TTS model on every utterance.
    pub fn with_tts_model(mut self, model: Option<String>) -> Self {
        self.tts_model = model.filter(|m| !m.is_empty());
        self
    }

    pub fn with_max_text_length(mut self, max_text_length: usize) -> Self {
        self.max_text_length = max_text_length;
        self
    }

    pub fn max_text_length(&self) -> usize {
        self.max_text_length
    }

    pub fn state(&self) -> SpeechState {
        if self.speaking.load(Ordering::Acquire) {
            SpeechState::Speaking
        } else {
            SpeechState::Idle
        }
    }

    /// Speaks `raw` after interrupting the current utterance.
    ///
    /// Failures are logged here and never returned; the outcome only reports
    /// what happened.
    pub async fn speak(&self, raw: &str) -> SpeakOutcome {
        let command = match SpeakCommand::new(raw, false, self.max_text_length) {
            Ok(command) => command,
            Err(CommandError::Empty) => return SpeakOutcome::Empty,
            Err(CommandError::Oversized { len, limit }) => {
                let err = VoiceError::OversizedText { len, limit };
                warn!(len, limit, "ignoring text: {}", err);
                return SpeakOutcome::Oversized;
            }
        };

        debug!(chars = command.text().chars().count(), "text received");

        let _guard = self.utterance_lock.lock().await;

        if let Err(e) = self.session.interrupt().await {
            let err = VoiceError::Interrupt(e);
            error!(text = command.text(), "{}", err);
        }

        match self.issue(command.text()).await {
            Ok(()) => {
                self.speaking.store(true, Ordering::Release);
                info!(text = command.text(), "started speaking");
                SpeakOutcome::Spoken
            }
            Err(err) => {
                // The interrupt already ran, so nothing is playing.
                self.speaking.store(false, Ordering::Release);
                error!(text = command.text(), "{}", err);
                SpeakOutcome::IssueFailed
            }
        }
    }

    /// Runs [`speak`](Self::speak) on its own task.
    pub fn spawn_speak(self: &Arc<Self>, text: String) -> JoinHandle<SpeakOutcome> {
        let serializer = Arc::clone(self);
        tokio::spawn(async move { serializer.speak(&text).await })
    }

    async fn issue(&self, text: &str) -> Result<(), VoiceError> {
        let options = SayOptions {
            tts_model: self.tts_model.clone(),
        };
        match self.session.say(text, options).await {
            Err(SessionError::UnsupportedOption(option)) if self.tts_model.is_some() => {
                debug!(%option, "session rejected TTS model override, retrying without it");
                self.session
                    .say(text, SayOptions::default())
                    .await
                    .map_err(VoiceError::SpeakIssue)
            }
            result => result.map_err(VoiceError::SpeakIssue),
        }
    }
}

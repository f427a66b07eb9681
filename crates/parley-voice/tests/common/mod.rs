#![allow(dead_code)]

use async_trait::async_trait;
use parley_voice::avatar::{AvatarBinding, AvatarClient, AvatarSession};
use parley_voice::{LiveKitConfig, SayOptions, SessionError, SpeechSession, VoiceError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start,
    Interrupt,
    Say {
        text: String,
        tts_model: Option<String>,
    },
}

impl Call {
    pub fn say(text: &str) -> Self {
        Call::Say {
            text: text.to_string(),
            tts_model: None,
        }
    }
}

/// Speech session that records every call and fails on demand.
#[derive(Default)]
pub struct RecordingSession {
    calls: Mutex<Vec<Call>>,
    routed_to: Mutex<Option<String>>,
    pub fail_interrupt: AtomicBool,
    pub reject_model_option: AtomicBool,
    /// Number of upcoming `say` calls that fail.
    pub failing_says: AtomicUsize,
    pub say_delay_ms: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn say_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Say { text, .. } => Some(text),
                Call::Start | Call::Interrupt => None,
            })
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn routed_to(&self) -> Option<String> {
        self.routed_to.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSession for RecordingSession {
    async fn interrupt(&self) -> Result<(), SessionError> {
        self.calls.lock().unwrap().push(Call::Interrupt);
        if self.fail_interrupt.load(Ordering::SeqCst) {
            return Err(SessionError::Failed("interrupt refused".to_string()));
        }
        Ok(())
    }

    async fn say(&self, text: &str, options: SayOptions) -> Result<(), SessionError> {
        self.calls.lock().unwrap().push(Call::Say {
            text: text.to_string(),
            tts_model: options.tts_model.clone(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = self.say_delay_ms.load(Ordering::SeqCst) as u64;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.reject_model_option.load(Ordering::SeqCst) && options.tts_model.is_some() {
            return Err(SessionError::UnsupportedOption("tts_model".to_string()));
        }
        let failing = self.failing_says.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_says.store(failing - 1, Ordering::SeqCst);
            return Err(SessionError::Failed("say refused".to_string()));
        }
        Ok(())
    }

    fn start(&self) {
        self.calls.lock().unwrap().push(Call::Start);
    }

    fn route_audio_to(&self, participant_identity: &str) {
        *self.routed_to.lock().unwrap() = Some(participant_identity.to_string());
    }
}

/// Avatar client that fails a fixed number of times before succeeding.
pub struct FlakyAvatarClient {
    failures_before_success: usize,
    attempts: AtomicUsize,
    bindings: Mutex<Vec<AvatarBinding>>,
}

impl FlakyAvatarClient {
    pub fn new(failures_before_success: usize) -> Self {
        Self {
            failures_before_success,
            attempts: AtomicUsize::new(0),
            bindings: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn bindings(&self) -> Vec<AvatarBinding> {
        self.bindings.lock().unwrap().clone()
    }
}

#[async_trait]
impl AvatarClient for FlakyAvatarClient {
    async fn start(
        &self,
        binding: AvatarBinding,
        session: &dyn SpeechSession,
        room_name: &str,
        _params: &LiveKitConfig,
    ) -> Result<AvatarSession, VoiceError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.bindings.lock().unwrap().push(binding.clone());
        if attempt <= self.failures_before_success {
            return Err(VoiceError::Avatar(format!("attempt {} refused", attempt)));
        }
        session.route_audio_to(&binding.participant_identity);
        Ok(AvatarSession {
            conversation_id: format!("conv-{}", attempt),
            participant_identity: binding.participant_identity,
            participant_name: binding.participant_name,
            room_name: room_name.to_string(),
        })
    }
}

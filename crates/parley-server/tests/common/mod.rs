#![allow(dead_code)]

use async_trait::async_trait;
use parley_voice::avatar::{AvatarBinding, AvatarClient, AvatarSession};
use parley_voice::{LiveKitConfig, RoomGateway, SayOptions, SessionError, SpeechSession, VoiceError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Room gateway that records calls instead of talking to LiveKit.
#[derive(Default)]
pub struct FakeGateway {
    pub dispatched: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<(String, String)>>,
    pub minted: Mutex<Vec<(String, String)>>,
    pub fail_dispatch: AtomicBool,
    pub fail_send: AtomicBool,
}

#[async_trait]
impl RoomGateway for FakeGateway {
    fn livekit_url(&self) -> &str {
        "wss://demo.livekit.cloud"
    }

    fn mint_token(&self, room_name: &str, identity: &str) -> Result<String, VoiceError> {
        self.minted
            .lock()
            .unwrap()
            .push((room_name.to_string(), identity.to_string()));
        Ok(format!("token-for-{}", identity))
    }

    async fn dispatch_agent(&self, room_name: &str) -> Result<(), VoiceError> {
        if self.fail_dispatch.load(Ordering::SeqCst) {
            return Err(VoiceError::RoomService("dispatch refused".to_string()));
        }
        self.dispatched.lock().unwrap().push(room_name.to_string());
        Ok(())
    }

    async fn send_text(&self, room_name: &str, text: &str) -> Result<(), VoiceError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(VoiceError::RoomService("room not found".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((room_name.to_string(), text.to_string()));
        Ok(())
    }
}

/// Shared log of what the fakes saw, in order.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub struct JournalSession {
    journal: Journal,
    say_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl JournalSession {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            say_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Makes each `say` take `delay` before it returns.
    pub fn with_say_delay(mut self, delay: Duration) -> Self {
        self.say_delay = delay;
        self
    }

    /// Most session calls ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SpeechSession for JournalSession {
    async fn interrupt(&self) -> Result<(), SessionError> {
        self.enter();
        self.journal.lock().unwrap().push("interrupt".to_string());
        self.exit();
        Ok(())
    }

    async fn say(&self, text: &str, options: SayOptions) -> Result<(), SessionError> {
        self.enter();
        let entry = match options.tts_model {
            Some(model) => format!("say:{}@{}", text, model),
            None => format!("say:{}", text),
        };
        self.journal.lock().unwrap().push(entry);
        if !self.say_delay.is_zero() {
            tokio::time::sleep(self.say_delay).await;
        }
        self.exit();
        Ok(())
    }

    fn start(&self) {
        self.journal.lock().unwrap().push("start".to_string());
    }

    fn route_audio_to(&self, participant_identity: &str) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("route:{}", participant_identity));
    }
}

/// Avatar client that fails a fixed number of times before succeeding.
pub struct JournalAvatar {
    journal: Journal,
    failures: usize,
    attempts: AtomicUsize,
}

impl JournalAvatar {
    pub fn new(journal: Journal, failures: usize) -> Self {
        Self {
            journal,
            failures,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvatarClient for JournalAvatar {
    async fn start(
        &self,
        binding: AvatarBinding,
        session: &dyn SpeechSession,
        room_name: &str,
        _params: &LiveKitConfig,
    ) -> Result<AvatarSession, VoiceError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal
            .lock()
            .unwrap()
            .push(format!("avatar-attempt:{}", attempt));
        if attempt <= self.failures {
            return Err(VoiceError::Avatar("replica unavailable".to_string()));
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

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

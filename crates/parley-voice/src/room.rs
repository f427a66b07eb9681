//! Room event subscription and the agent's room handle.

use crate::error::VoiceError;
use crate::event::{accept_data_event, extract_text};
use crate::speech::SpeechSerializer;
use async_trait::async_trait;
use parley_types::InboundEvent;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, error, info, trace};

pub const DATA_RECEIVED_EVENT: &str = "data_received";

/// Names a text-stream event has gone by, in the order they are tried.
pub const TEXT_STREAM_EVENTS: [&str; 3] = ["text_stream", "text_stream_received", "text_received"];

pub type EventHandler = Arc<dyn Fn(InboundEvent) + Send + Sync>;

/// Callback registration on a room's event bus.
pub trait RoomEvents: Send + Sync {
    /// Registers `handler` for `event_name`.
    ///
    /// Fails if the room does not emit an event by that name.
    fn on(&self, event_name: &str, handler: EventHandler) -> Result<(), VoiceError>;
}

/// Destination for synthesized audio.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Publishes PCM audio, either to the whole room or to one participant.
    async fn publish_audio(&self, destination: Option<&str>, pcm: &[u8]) -> Result<(), VoiceError>;
}

/// Registers `handler` under the first text-stream alias the room accepts.
///
/// Returns the alias used, or `None` if the room has no text-stream event.
pub fn subscribe_text_stream(room: &dyn RoomEvents, handler: EventHandler) -> Option<&'static str> {
    for name in TEXT_STREAM_EVENTS {
        match room.on(name, Arc::clone(&handler)) {
            Ok(()) => {
                info!(event = name, "subscribed to text stream event");
                return Some(name);
            }
            Err(e) => debug!(event = name, "text stream alias unavailable: {}", e),
        }
    }
    info!("text stream events not available on this room");
    None
}

/// Wires a room's data and text-stream events into `serializer`.
///
/// Each accepted message is spoken on its own task so the transport callback
/// never waits on the utterance lock. Must be called from within a Tokio
/// runtime.
pub fn attach_room_handlers(room: &dyn RoomEvents, serializer: Arc<SpeechSerializer>) {
    let runtime = Handle::current();

    let data_handler: EventHandler = {
        let serializer = Arc::clone(&serializer);
        let runtime = runtime.clone();
        Arc::new(move |event: InboundEvent| match accept_data_event(&event) {
            Ok(message) => {
                let serializer = Arc::clone(&serializer);
                runtime.spawn(async move { serializer.speak(&message.text).await });
            }
            Err(VoiceError::Filtered(reason)) => trace!(%reason, "dropping data message"),
            Err(e) => debug!("dropping data message: {}", e),
        })
    };

    match room.on(DATA_RECEIVED_EVENT, data_handler) {
        Ok(()) => info!("subscribed to room data messages"),
        Err(e) => error!("failed to subscribe to data messages: {}", e),
    }

    let text_handler: EventHandler = Arc::new(move |event: InboundEvent| {
        if let Some(text) = extract_text(&event).filter(|t| !t.is_empty()) {
            let serializer = Arc::clone(&serializer);
            runtime.spawn(async move { serializer.speak(&text).await });
        }
    });
    subscribe_text_stream(room, text_handler);
}

/// The agent's handle on its room.
///
/// The transport backend delivers events through [`emit`](Self::emit) and
/// plays published audio through the output set with
/// [`set_audio_output`](Self::set_audio_output). Only the event names the
/// room advertises can be subscribed to.
pub struct AgentRoom {
    name: String,
    local_identity: String,
    advertised: HashSet<String>,
    /// Held only for brief map operations, never across `.await`.
    handlers: RwLock<HashMap<String, Vec<EventHandler>>>,
    audio_output: RwLock<Option<Arc<dyn AudioSink>>>,
    connected: AtomicBool,
    disconnected: Notify,
}

impl AgentRoom {
    /// Creates a connected room handle advertising `data_received` and
    /// `text_received`.
    pub fn new(name: impl Into<String>, local_identity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_identity: local_identity.into(),
            advertised: [DATA_RECEIVED_EVENT, "text_received"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            handlers: RwLock::new(HashMap::new()),
            audio_output: RwLock::new(None),
            connected: AtomicBool::new(true),
            disconnected: Notify::new(),
        }
    }

    /// Replaces the set of advertised event names.
    pub fn with_events(mut self, names: &[&str]) -> Self {
        self.advertised = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_identity(&self) -> &str {
        &self.local_identity
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Routes published audio to `output`, typically the room's local audio
    /// track.
    pub fn set_audio_output(&self, output: Arc<dyn AudioSink>) {
        match self.audio_output.write() {
            Ok(mut slot) => *slot = Some(output),
            Err(poisoned) => *poisoned.into_inner() = Some(output),
        }
    }

    fn audio_output(&self) -> Option<Arc<dyn AudioSink>> {
        match self.audio_output.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Delivers `event` to every handler registered for `event_name`.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event_name: &str, event: InboundEvent) -> usize {
        let handlers: Vec<EventHandler> = match self.handlers.read() {
            Ok(map) => map.get(event_name).cloned().unwrap_or_default(),
            Err(poisoned) => poisoned
                .into_inner()
                .get(event_name)
                .cloned()
                .unwrap_or_default(),
        };
        for handler in &handlers {
            handler(event.clone());
        }
        handlers.len()
    }

    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            info!(room = %self.name, "agent disconnecting from room");
            self.disconnected.notify_waiters();
        }
    }

    /// Resolves once [`disconnect`](Self::disconnect) has been called.
    pub async fn wait_for_disconnect(&self) {
        let notified = self.disconnected.notified();
        if !self.is_connected() {
            return;
        }
        notified.await;
    }
}

impl RoomEvents for AgentRoom {
    fn on(&self, event_name: &str, handler: EventHandler) -> Result<(), VoiceError> {
        if !self.advertised.contains(event_name) {
            return Err(VoiceError::Subscription(format!(
                "room does not emit '{}'",
                event_name
            )));
        }
        let mut map = self
            .handlers
            .write()
            .map_err(|_| VoiceError::Subscription("handler registry poisoned".to_string()))?;
        map.entry(event_name.to_string()).or_default().push(handler);
        Ok(())
    }
}

#[async_trait]
impl AudioSink for AgentRoom {
    async fn publish_audio(&self, destination: Option<&str>, pcm: &[u8]) -> Result<(), VoiceError> {
        if !self.is_connected() {
            return Err(VoiceError::RoomService(
                "Agent is not connected to a room".to_string(),
            ));
        }

        let output = self.audio_output().ok_or_else(|| {
            VoiceError::RoomService(format!("room '{}' has no audio output attached", self.name))
        })?;

        debug!(
            bytes = pcm.len(),
            room = %self.name,
            destination = destination.unwrap_or("<room>"),
            "publishing audio"
        );
        output.publish_audio(destination, pcm).await
    }
}

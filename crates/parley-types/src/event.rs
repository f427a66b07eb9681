//! Inbound realtime-transport events.
//!
//! Transport backends have delivered data-channel and text-stream messages in
//! several shapes over time: keyword fields, a packet object as the first
//! argument, raw text or bytes as the first argument, and a legacy form where
//! the topic is the fourth positional argument. An [`InboundEvent`] records
//! whatever the backend handed over without deciding which shape it is; the
//! extraction logic in `parley-voice` resolves it.

/// Raw message content as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

/// A data packet object exposing `data` and `topic`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataPacket {
    pub data: Option<Payload>,
    pub topic: Option<String>,
}

impl DataPacket {
    pub fn new(data: impl Into<Payload>, topic: Option<&str>) -> Self {
        Self {
            data: Some(data.into()),
            topic: topic.map(str::to_string),
        }
    }
}

/// A text-stream record exposing `text` and/or `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRecord {
    pub text: Option<String>,
    pub message: Option<String>,
}

/// One positional argument of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventArg {
    Text(String),
    Bytes(Vec<u8>),
    Packet(DataPacket),
    Record(TextRecord),
    /// A value the relay has no use for (participant handles, enums, ...).
    Opaque,
}

/// An event as delivered to a room callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundEvent {
    pub args: Vec<EventArg>,
    pub topic: Option<String>,
    pub data: Option<Payload>,
    pub packet: Option<DataPacket>,
    pub text: Option<String>,
}

impl InboundEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arg(mut self, arg: EventArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_packet(mut self, packet: DataPacket) -> Self {
        self.packet = Some(packet);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

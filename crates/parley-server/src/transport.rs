//! Translation between LiveKit room traffic and [`AgentRoom`] events.
//!
//! [`AgentRoom`]: parley_voice::AgentRoom

use parley_types::{DataPacket, EventArg, InboundEvent, TextRecord};

/// Sample rate of the PCM the speech session produces.
pub const SAMPLE_RATE: u32 = 24_000;
pub const NUM_CHANNELS: u32 = 1;
/// Samples per channel in one 20 ms frame.
pub const FRAME_SAMPLES: usize = (SAMPLE_RATE / 50) as usize;

/// Event for a data packet received on the room's data channel.
///
/// The packet is the first argument and the sender, if any, the second.
pub fn data_event(payload: &[u8], topic: Option<&str>, has_sender: bool) -> InboundEvent {
    let event = InboundEvent::new().with_arg(EventArg::Packet(DataPacket::new(payload, topic)));
    if has_sender {
        event.with_arg(EventArg::Opaque)
    } else {
        event
    }
}

/// Event for a chat message, delivered as a text-stream record.
pub fn chat_event(message: &str) -> InboundEvent {
    InboundEvent::new().with_arg(EventArg::Record(TextRecord {
        text: None,
        message: Some(message.to_string()),
    }))
}

/// Splits little-endian 16-bit PCM into 20 ms frames.
///
/// A trailing odd byte is dropped; the last frame may be short.
pub fn pcm_frames(pcm: &[u8]) -> Vec<Vec<i16>> {
    let samples: Vec<i16> = pcm
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    samples
        .chunks(FRAME_SAMPLES)
        .map(<[i16]>::to_vec)
        .collect()
}

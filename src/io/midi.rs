//! Raw MIDI short-message codec.
//!
//! Only the channel voice messages the host acts on are decoded. Program
//! Change and Channel Pressure are recognised so their data byte can be
//! consumed, but they carry no event downstream.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;
const CHANNEL_PRESSURE: u8 = 0xD0;

/// A decoded short message. Channels are 1-16, note velocities are normalized
/// to 0.0-1.0, controller values stay raw (0-127).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteEvent {
    NoteOn { channel: u8, note: u8, velocity: f32 },
    NoteOff { channel: u8, note: u8, velocity: f32 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Program Change / Channel Pressure: read off the wire, not acted on.
    Unsupported { status: u8 },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedMessage {
    #[error("empty message")]
    Empty,
    #[error("unsupported status byte {0:#04x}")]
    UnknownStatus(u8),
    #[error("status {status:#04x} needs {needed} data bytes, got {got}")]
    Truncated { status: u8, needed: usize, got: usize },
}

/// Number of data bytes that follow `status`, or `None` if the host does not
/// understand the status byte at all.
pub fn data_len(status: u8) -> Option<usize> {
    match status & 0xF0 {
        NOTE_OFF | NOTE_ON | CONTROL_CHANGE => Some(2),
        PROGRAM_CHANGE | CHANNEL_PRESSURE => Some(1),
        _ => None,
    }
}

/// Decode one short message starting at `bytes[0]`. Trailing bytes past the
/// message are ignored.
pub fn decode(bytes: &[u8]) -> Result<NoteEvent, MalformedMessage> {
    let (&status, data) = bytes.split_first().ok_or(MalformedMessage::Empty)?;
    let needed = data_len(status).ok_or(MalformedMessage::UnknownStatus(status))?;
    if data.len() < needed {
        return Err(MalformedMessage::Truncated {
            status,
            needed,
            got: data.len(),
        });
    }

    let channel = (status & 0x0F) + 1;
    let event = match status & 0xF0 {
        NOTE_ON => NoteEvent::NoteOn {
            channel,
            note: data[0],
            velocity: data[1] as f32 / 127.0,
        },
        NOTE_OFF => NoteEvent::NoteOff {
            channel,
            note: data[0],
            velocity: data[1] as f32 / 127.0,
        },
        CONTROL_CHANGE => NoteEvent::ControlChange {
            channel,
            controller: data[0],
            value: data[1],
        },
        _ => NoteEvent::Unsupported { status },
    };

    Ok(event)
}

impl NoteEvent {
    /// A Note On that actually starts a note. Velocity 0 is a release.
    pub fn is_note_on(&self) -> bool {
        matches!(self, NoteEvent::NoteOn { velocity, .. } if *velocity > 0.0)
    }

    /// Note Off, or the Note On / velocity 0 spelling of it.
    pub fn is_note_off(&self) -> bool {
        match self {
            NoteEvent::NoteOff { .. } => true,
            NoteEvent::NoteOn { velocity, .. } => *velocity <= 0.0,
            _ => false,
        }
    }

    pub fn note(&self) -> Option<u8> {
        match self {
            NoteEvent::NoteOn { note, .. } | NoteEvent::NoteOff { note, .. } => Some(*note),
            _ => None,
        }
    }

    /// Wire form of the event. Velocity is re-quantized to 127 steps.
    pub fn encode(&self) -> Option<[u8; 3]> {
        let status = |kind: u8, channel: u8| kind | (channel.saturating_sub(1) & 0x0F);
        let quantize = |velocity: f32| (velocity * 127.0).round().clamp(0.0, 127.0) as u8;

        match *self {
            NoteEvent::NoteOn {
                channel,
                note,
                velocity,
            } => Some([status(NOTE_ON, channel), note, quantize(velocity)]),
            NoteEvent::NoteOff {
                channel,
                note,
                velocity,
            } => Some([status(NOTE_OFF, channel), note, quantize(velocity)]),
            NoteEvent::ControlChange {
                channel,
                controller,
                value,
            } => Some([status(CONTROL_CHANGE, channel), controller, value]),
            NoteEvent::Unsupported { .. } => None,
        }
    }
}

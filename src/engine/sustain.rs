//! Held-note policy for batch rendering.
//!
//! The synthesizer only sees the events delivered with each block. Once the
//! input stream has ended, nothing would otherwise tell it a key is still
//! down, so the policy re-sends the last Note On into empty blocks for a
//! bounded number of blocks, then sends the matching Note Off.

use crate::io::NoteEvent;

/// Blocks a note is held after input closes, at the reference 512 / 44.1 kHz.
pub const DEFAULT_SUSTAIN_BLOCKS: u32 = 100;

/// [`DEFAULT_SUSTAIN_BLOCKS`] expressed as time, so other block sizes and
/// sample rates hold for the same duration.
pub const DEFAULT_SUSTAIN_SECONDS: f64 = DEFAULT_SUSTAIN_BLOCKS as f64 * 512.0 / 44_100.0;

/// Convert a hold time to a whole number of blocks.
pub fn blocks_for_duration(seconds: f64, sample_rate: u32, block_size: usize) -> u32 {
    if !(seconds > 0.0) || block_size == 0 {
        return 0;
    }
    (seconds * sample_rate as f64 / block_size as f64)
        .round()
        .min(u32::MAX as f64) as u32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SustainState {
    Idle,
    /// `remaining` re-triggers left before the note is released.
    Held { note_on: NoteEvent, remaining: u32 },
}

/// What the policy did to a block's event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SustainAction {
    None,
    Retriggered,
    Released,
}

pub struct SustainPolicy {
    state: SustainState,
    max_blocks: u32,
}

impl SustainPolicy {
    pub fn new(max_blocks: u32) -> Self {
        Self {
            state: SustainState::Idle,
            max_blocks,
        }
    }

    pub fn state(&self) -> SustainState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SustainState::Idle)
    }

    /// Observe this block's events and, if the source is closed and nothing
    /// arrived, add the held note (or its release) as the block's only event.
    pub fn apply(&mut self, events: &mut Vec<NoteEvent>, source_closed: bool) -> SustainAction {
        for event in events.iter() {
            if event.is_note_on() {
                self.state = SustainState::Held {
                    note_on: *event,
                    remaining: self.max_blocks,
                };
            } else if event.is_note_off() {
                if let SustainState::Held { note_on, .. } = self.state {
                    if note_on.note() == event.note() {
                        self.state = SustainState::Idle;
                    }
                }
            }
        }

        // Real input always wins over re-triggers
        if !events.is_empty() || !source_closed {
            return SustainAction::None;
        }

        match self.state {
            SustainState::Idle => SustainAction::None,
            SustainState::Held { note_on, remaining } if remaining > 0 => {
                events.push(note_on);
                self.state = SustainState::Held {
                    note_on,
                    remaining: remaining - 1,
                };
                SustainAction::Retriggered
            }
            SustainState::Held { note_on, .. } => {
                events.push(release_for(&note_on));
                self.state = SustainState::Idle;
                SustainAction::Released
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = SustainState::Idle;
    }
}

impl Default for SustainPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SUSTAIN_BLOCKS)
    }
}

fn release_for(note_on: &NoteEvent) -> NoteEvent {
    match *note_on {
        NoteEvent::NoteOn { channel, note, .. } => NoteEvent::NoteOff {
            channel,
            note,
            velocity: 0.0,
        },
        other => other,
    }
}

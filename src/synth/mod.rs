// Purpose: the synthesis collaborator seam, one concrete instrument behind it,
// and the named parameters pushed into it at session start

pub mod mono;
pub mod params;

pub use mono::MonoSynth;
pub use params::ParameterSet;

use crate::{
    error::Result,
    io::{AudioBlock, NoteEvent},
};

/// What the render loop and the realtime callback need from an instrument.
///
/// `render` receives every event for the block up front; there is no
/// intra-block timing.
pub trait Synthesizer: Send {
    /// Prepare for a stream. Fails if the instrument cannot run at this
    /// configuration, which is fatal for the session.
    fn configure(&mut self, sample_rate: f32, block_size: usize) -> Result<()>;

    /// Set a parameter by display name. Returns `false` for unknown names.
    fn set_parameter(&mut self, name: &str, value: f32) -> bool;

    /// Apply `events` at block start, then fill `block` in place.
    fn render(&mut self, events: &[NoteEvent], block: &mut AudioBlock);

    /// Drop runtime state. Safe to call more than once.
    fn release(&mut self);

    /// Current parameter values, for display.
    fn parameters(&self) -> Vec<(&'static str, f32)> {
        Vec::new()
    }
}

/// Allow boxed synths to be used where a concrete synth is expected
impl Synthesizer for Box<dyn Synthesizer> {
    fn configure(&mut self, sample_rate: f32, block_size: usize) -> Result<()> {
        (**self).configure(sample_rate, block_size)
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        (**self).set_parameter(name, value)
    }

    fn render(&mut self, events: &[NoteEvent], block: &mut AudioBlock) {
        (**self).render(events, block)
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn parameters(&self) -> Vec<(&'static str, f32)> {
        (**self).parameters()
    }
}

/// Convert MIDI note number to frequency in Hz, relative to a tuning
/// reference for A4 (MIDI note 69).
#[inline]
pub fn midi_note_to_freq(note: u8, a4: f32) -> f32 {
    a4 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

//! Low-level DSP primitives the synthesizer is built from.
//!
//! Both blocks are allocation-free and safe to run inside the audio callback.

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Phase-accumulator oscillator with four waveforms.
pub mod oscillator;

pub use envelope::{Envelope, EnvelopeState};
pub use oscillator::{OscillatorBlock, OscillatorWaveform};

pub mod config;
pub mod dsp;
pub mod engine; // Batch render loop and sustain policy
pub mod error;
pub mod io;
pub mod runtime; // Realtime audio session
pub mod synth; // Synthesizer seam and the built-in mono synth

pub use error::{Error, Result};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;

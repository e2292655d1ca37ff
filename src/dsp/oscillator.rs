#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::f32::consts::TAU;

/*
Phase-accumulator oscillator
============================

Phase runs over [0, 1) and advances by `frequency / sample_rate` per sample.
Every waveform is a pure function of the phase, so the oscillator state is a
single float:

  Sine      sin(2pi * phase)
  Square    +1 for the first half of the cycle, -1 for the second
  Sawtooth  ramp from -1 to +1
  Triangle  -1 -> +1 -> -1, linear both ways

No band-limiting: square and saw alias at high pitches.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OscillatorWaveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl OscillatorWaveform {
    pub const ALL: [OscillatorWaveform; 4] = [
        OscillatorWaveform::Sine,
        OscillatorWaveform::Square,
        OscillatorWaveform::Sawtooth,
        OscillatorWaveform::Triangle,
    ];

    /// Map a choice index (rounded, clamped to 0..=3) to a waveform.
    pub fn from_index(value: f32) -> Self {
        let idx = value.round().clamp(0.0, 3.0) as usize;
        Self::ALL[idx]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    fn sample(self, phase: f32) -> f32 {
        match self {
            OscillatorWaveform::Sine => (phase * TAU).sin(),
            OscillatorWaveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            OscillatorWaveform::Sawtooth => 2.0 * phase - 1.0,
            OscillatorWaveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
        }
    }
}

pub struct OscillatorBlock {
    waveform: OscillatorWaveform,
    phase: f32,
}

impl OscillatorBlock {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self { waveform, phase: 0.0 }
    }

    pub fn sine() -> Self {
        Self::new(OscillatorWaveform::Sine)
    }

    pub fn waveform(&self) -> OscillatorWaveform {
        self.waveform
    }

    /// Switch waveform without resetting phase.
    pub fn set_waveform(&mut self, waveform: OscillatorWaveform) {
        self.waveform = waveform;
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let out = self.waveform.sample(self.phase);
        self.phase += frequency / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        out
    }

    pub fn render(&mut self, out: &mut [f32], frequency: f32, sample_rate: f32) {
        for sample in out.iter_mut() {
            *sample = self.next_sample(frequency, sample_rate);
        }
    }
}

impl Default for OscillatorBlock {
    fn default() -> Self {
        Self::sine()
    }
}

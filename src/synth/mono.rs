//! MonoSynth - one oscillator through one ADSR envelope.
//!
//! Monophonic: a new note takes over the voice. Re-sending Note On for the
//! note that is already held keeps the envelope where it is, so a host that
//! re-triggers a held note every block does not restart the attack.

use tracing::debug;

use super::{midi_note_to_freq, Synthesizer};
use crate::{
    dsp::{Envelope, OscillatorBlock, OscillatorWaveform},
    error::{Error, Result},
    io::{AudioBlock, NoteEvent},
};

pub const FREQUENCY: &str = "Frequency";
pub const GAIN: &str = "Gain";
pub const WAVEFORM: &str = "Waveform";
pub const ATTACK: &str = "Attack";
pub const DECAY: &str = "Decay";
pub const SUSTAIN: &str = "Sustain";
pub const RELEASE: &str = "Release";

const ALL_SOUND_OFF: u8 = 120;
const ALL_NOTES_OFF: u8 = 123;

pub struct MonoSynth {
    sample_rate: f32,
    block_size: usize,
    osc: OscillatorBlock,
    env: Envelope,
    /// Tuning reference for A4 (Hz)
    tuning: f32,
    gain: f32,
    current_note: Option<u8>,
    velocity: f32,
}

impl MonoSynth {
    pub fn new() -> Self {
        Self {
            sample_rate: 44_100.0,
            block_size: 512,
            osc: OscillatorBlock::sine(),
            env: Envelope::adsr(0.003, 0.05, 0.8, 0.01),
            tuning: 440.0,
            gain: 0.7,
            current_note: None,
            velocity: 0.0,
        }
    }

    pub fn current_note(&self) -> Option<u8> {
        self.current_note
    }

    /// True while a note is sounding, including its release tail.
    pub fn is_active(&self) -> bool {
        self.current_note.is_some() && self.env.is_active()
    }

    fn handle_event(&mut self, event: &NoteEvent) {
        match *event {
            NoteEvent::NoteOn { note, velocity, .. } if velocity > 0.0 => {
                self.note_on(note, velocity)
            }
            NoteEvent::NoteOn { note, .. } | NoteEvent::NoteOff { note, .. } => self.note_off(note),
            NoteEvent::ControlChange {
                controller: ALL_SOUND_OFF | ALL_NOTES_OFF,
                ..
            } => self.env.gate_off(),
            NoteEvent::ControlChange {
                controller, value, ..
            } => debug!("Ignoring CC {controller} = {value}"),
            NoteEvent::Unsupported { .. } => {}
        }
    }

    fn note_on(&mut self, note: u8, velocity: f32) {
        self.velocity = velocity;
        if self.current_note == Some(note) && self.env.is_gated() {
            return;
        }
        self.current_note = Some(note);
        self.env.gate_on();
    }

    fn note_off(&mut self, note: u8) {
        // Only release if it's the note we're playing
        if self.current_note == Some(note) {
            self.env.gate_off();
        }
    }
}

impl Default for MonoSynth {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer for MonoSynth {
    fn configure(&mut self, sample_rate: f32, block_size: usize) -> Result<()> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::Synth(format!("unusable sample rate {sample_rate}")));
        }
        if block_size == 0 {
            return Err(Error::Synth("block size must be non-zero".into()));
        }

        self.sample_rate = sample_rate;
        self.block_size = block_size;
        self.env.set_sample_rate(sample_rate);
        self.osc.reset();
        self.env.reset();
        self.current_note = None;
        Ok(())
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        let is = |param: &str| name.eq_ignore_ascii_case(param);

        if is(FREQUENCY) {
            self.tuning = value.clamp(20.0, 20_000.0);
        } else if is(GAIN) {
            self.gain = value.clamp(0.0, 1.0);
        } else if is(WAVEFORM) {
            self.osc.set_waveform(OscillatorWaveform::from_index(value));
        } else if is(ATTACK) {
            self.env.set_attack(value);
        } else if is(DECAY) {
            self.env.set_decay(value);
        } else if is(SUSTAIN) {
            self.env.set_sustain(value);
        } else if is(RELEASE) {
            self.env.set_release(value);
        } else {
            return false;
        }
        true
    }

    fn render(&mut self, events: &[NoteEvent], block: &mut AudioBlock) {
        for event in events {
            self.handle_event(event);
        }

        block.clear();
        if block.channels() == 0 {
            return;
        }

        if let Some(note) = self.current_note {
            let frequency = midi_note_to_freq(note, self.tuning);
            let amplitude = self.gain * self.velocity;

            for sample in block.channel_mut(0).iter_mut() {
                let level = self.env.next_sample();
                *sample = self.osc.next_sample(frequency, self.sample_rate) * level * amplitude;
            }

            // Envelope finished its release - free the voice
            if !self.env.is_active() {
                self.current_note = None;
            }
        }

        block.copy_first_to_all();
    }

    fn release(&mut self) {
        self.env.reset();
        self.osc.reset();
        self.current_note = None;
        self.velocity = 0.0;
    }

    fn parameters(&self) -> Vec<(&'static str, f32)> {
        vec![
            (FREQUENCY, self.tuning),
            (GAIN, self.gain),
            (WAVEFORM, self.osc.waveform().index() as f32),
            (ATTACK, self.env.attack()),
            (DECAY, self.env.decay()),
            (SUSTAIN, self.env.sustain()),
            (RELEASE, self.env.release()),
        ]
    }
}

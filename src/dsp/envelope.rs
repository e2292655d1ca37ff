use crate::MIN_TIME;

/*
Linear ADSR envelope
====================

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release

Times are seconds, converted to a per-sample step against the sample rate the
envelope was last given:

    step = change / (time_seconds * sample_rate)

Stages:

    Idle --gate_on--> Attack --level=1--> Decay --level=S--> Sustain
      ^                  |                  |                   |
      |                  +----- gate_off ---+-------------------+
      |                                     v
      +------------- level=0 ----------- Release

gate_off releases from whatever level the envelope is at, so releasing during
the attack does not click. Release is interpolated from a snapshot of that
level so it lands on exactly 0.0.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

pub struct Envelope {
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,
    sample_rate: f32,

    stage: EnvelopeState,
    level: f32,

    decay_start_level: f32,
    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Envelope {
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack_time: attack.max(MIN_TIME),
            decay_time: decay.max(MIN_TIME),
            sustain_level: sustain.clamp(0.0, 1.0),
            release_time: release.max(MIN_TIME),
            sample_rate: 44_100.0,

            stage: EnvelopeState::Idle,
            level: 0.0,
            decay_start_level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.attack_time = seconds.max(MIN_TIME);
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.decay_time = seconds.max(MIN_TIME);
    }

    pub fn set_sustain(&mut self, level: f32) {
        self.sustain_level = level.clamp(0.0, 1.0);
    }

    pub fn set_release(&mut self, seconds: f32) {
        self.release_time = seconds.max(MIN_TIME);
    }

    pub fn attack(&self) -> f32 {
        self.attack_time
    }

    pub fn decay(&self) -> f32 {
        self.decay_time
    }

    pub fn sustain(&self) -> f32 {
        self.sustain_level
    }

    pub fn release(&self) -> f32 {
        self.release_time
    }

    /// Gate high: restart the attack from zero.
    ///
    /// Callers that want a held note to keep sounding (sustain re-triggers)
    /// must check [`Envelope::is_gated`] first, or every re-trigger clicks.
    pub fn gate_on(&mut self) {
        self.level = 0.0; // hard restart, no legato
        self.stage = EnvelopeState::Attack;
        self.release_elapsed_samples = 0;
    }

    /// Gate low: ramp from the current level down to zero.
    pub fn gate_off(&mut self) {
        if matches!(self.stage, EnvelopeState::Idle | EnvelopeState::Release) {
            return;
        }

        // Release interpolates from this snapshot, not from the live level
        self.release_start_level = self.level;

        // Length is fixed up front so the per-sample step needs no division
        self.release_total_samples = (self.release_time * self.sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeState::Release;
    }

    /// Advance one sample and return the new level.
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                // 0.0 -> 1.0 over attack_time seconds
                self.level += 1.0 / (self.attack_time * self.sample_rate);

                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.decay_start_level = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                // 1.0 -> sustain over decay_time, same slope whatever S is
                let target = self.sustain_level;
                let total_drop = self.decay_start_level - target;
                self.level -= total_drop / (self.decay_time * self.sample_rate);

                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                // Sustain changes take effect immediately while held
                self.level = self.sustain_level;
            }

            EnvelopeState::Release => {
                // level = start * (1 - elapsed / total), so the last sample is 0.0
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);

                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);

                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// True while the gate is held (attack, decay or sustain).
    pub fn is_gated(&self) -> bool {
        matches!(
            self.stage,
            EnvelopeState::Attack | EnvelopeState::Decay | EnvelopeState::Sustain
        )
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.stage, EnvelopeState::Idle)
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.decay_start_level = 0.0;
        self.release_elapsed_samples = 0;
        self.release_start_level = 0.0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }
}

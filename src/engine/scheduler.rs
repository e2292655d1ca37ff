//! Block-based render loop for batch mode.
//!
//! ```text
//!   source ──read_next()──► events ──SustainPolicy──► synth.render() ──► PcmSink
//!      ▲                                                                   │
//!      └────────────── once per block, until the budget is spent ─────────┘
//! ```

use std::io::Write;

use tracing::{debug, info};

use super::sustain::{SustainAction, SustainPolicy};
use crate::{
    error::{Error, Result},
    io::{AudioBlock, MidiSource, NoteEvent, PcmSink, SourceRead},
    synth::Synthesizer,
};

const PROGRESS_INTERVAL: u64 = 100;

/// How many samples a session may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleBudget {
    /// Stop before the first block that would start at or past this count.
    Bounded(u64),
    /// Stop once input has closed and no note is held.
    Unbounded,
}

impl SampleBudget {
    pub fn from_duration(seconds: f64, sample_rate: u32) -> Self {
        if seconds > 0.0 {
            SampleBudget::Bounded((seconds * sample_rate as f64).floor() as u64)
        } else {
            SampleBudget::Unbounded
        }
    }
}

/// Mutable progress of one batch run.
#[derive(Debug, Clone, Copy)]
pub struct RenderSession {
    pub samples_processed: u64,
    pub source_closed: bool,
    pub budget: SampleBudget,
    pub blocks: u64,
    pub events_read: u64,
}

impl RenderSession {
    pub fn new(budget: SampleBudget) -> Self {
        Self {
            samples_processed: 0,
            source_closed: false,
            budget,
            blocks: 0,
            events_read: 0,
        }
    }

    fn is_finished(&self, sustain: &SustainPolicy) -> bool {
        match self.budget {
            SampleBudget::Bounded(limit) => self.samples_processed >= limit,
            SampleBudget::Unbounded => self.source_closed && sustain.is_idle(),
        }
    }

    fn remaining_samples(&self) -> Option<u64> {
        match self.budget {
            SampleBudget::Bounded(limit) => Some(limit.saturating_sub(self.samples_processed)),
            SampleBudget::Unbounded => None,
        }
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderReport {
    pub blocks: u64,
    pub samples: u64,
    pub events_read: u64,
    pub retriggers: u64,
    pub bytes_written: u64,
}

pub struct BlockScheduler {
    block_size: usize,
    channels: usize,
    budget: SampleBudget,
    sustain: SustainPolicy,
}

impl BlockScheduler {
    pub fn new(block_size: usize, channels: usize, budget: SampleBudget) -> Self {
        Self {
            block_size,
            channels,
            budget,
            sustain: SustainPolicy::default(),
        }
    }

    pub fn with_sustain_blocks(mut self, blocks: u32) -> Self {
        self.sustain = SustainPolicy::new(blocks);
        self
    }

    /// Render blocks until the budget is spent, writing each one to `sink`.
    ///
    /// `synth` must already be configured. Only sink write failures abort
    /// the run; bad input just closes the source.
    pub fn run<S, M, W>(
        &mut self,
        synth: &mut S,
        source: &mut M,
        sink: &mut PcmSink<W>,
    ) -> Result<RenderReport>
    where
        S: Synthesizer + ?Sized,
        M: MidiSource + ?Sized,
        W: Write,
    {
        if self.block_size == 0 || self.channels == 0 {
            return Err(Error::Config(format!(
                "block size and channel count must be non-zero (got {} x {})",
                self.block_size, self.channels
            )));
        }

        self.sustain.reset();
        let mut session = RenderSession::new(self.budget);
        let mut block = AudioBlock::new(self.channels, self.block_size);
        let mut events: Vec<NoteEvent> = Vec::with_capacity(16);
        let mut retriggers = 0;
        let bytes_before = sink.bytes_written();

        info!(
            "Rendering {} ch x {} frames per block, budget {:?}",
            self.channels, self.block_size, self.budget
        );

        while !session.is_finished(&self.sustain) {
            events.clear();
            if !session.source_closed {
                pull_events(source, &mut events, &mut session);
            }

            if session.blocks == 0 && !events.is_empty() {
                debug!("First block carries {} events: {:?}", events.len(), events);
            }

            match self.sustain.apply(&mut events, session.source_closed) {
                SustainAction::Retriggered => retriggers += 1,
                SustainAction::Released => {
                    debug!("Sustain cap reached after block {}, releasing", session.blocks)
                }
                SustainAction::None => {}
            }

            block.clear();
            synth.render(&events, &mut block);
            sink.write_block(&block)?;

            session.samples_processed += self.block_size as u64;
            session.blocks += 1;

            if session.blocks % PROGRESS_INTERVAL == 0 {
                debug!(
                    "Rendered {} blocks ({} samples)",
                    session.blocks, session.samples_processed
                );
            }
        }

        sink.flush()?;

        let report = RenderReport {
            blocks: session.blocks,
            samples: session.samples_processed,
            events_read: session.events_read,
            retriggers,
            bytes_written: sink.bytes_written() - bytes_before,
        };
        info!(
            "Render complete: {} blocks, {} samples, {} events, {} bytes",
            report.blocks, report.samples, report.events_read, report.bytes_written
        );
        Ok(report)
    }
}

/// Drain everything available for this block. Stops at the first pending,
/// closing or malformed read.
fn pull_events<M: MidiSource + ?Sized>(
    source: &mut M,
    events: &mut Vec<NoteEvent>,
    session: &mut RenderSession,
) {
    loop {
        match source.read_next() {
            SourceRead::Event(event) => {
                events.push(event);
                session.events_read += 1;
            }
            SourceRead::Pending => break,
            SourceRead::EndOfStream => {
                session.source_closed = true;
                debug!(
                    "MIDI input closed at sample {}, remaining: {:?}",
                    session.samples_processed,
                    session.remaining_samples()
                );
                break;
            }
            SourceRead::Malformed(err) => {
                session.source_closed = true;
                debug!("Malformed MIDI input ({err}), closing input");
                break;
            }
        }
    }
}

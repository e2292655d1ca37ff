//! Batch rendering: MIDI bytes in, PCM bytes out, one block at a time.

pub mod scheduler;
pub mod sustain;

pub use scheduler::{BlockScheduler, RenderReport, RenderSession, SampleBudget};
pub use sustain::{SustainAction, SustainPolicy, SustainState};

use std::io::{Read, Write};

use tracing::{debug, info};

use crate::{
    config::HostConfig,
    error::Result,
    io::{PcmSink, StdinMidiSource},
    synth::Synthesizer,
};

impl BlockScheduler {
    pub fn from_config(config: &HostConfig) -> Self {
        BlockScheduler::new(config.block_size, config.channels, config.sample_budget())
            .with_sustain_blocks(config.sustain_blocks())
    }
}

/// Run a full batch session: configure `synth`, apply parameters, render
/// `input` to `output`, then release the synth.
pub fn render_batch<S, R, W>(
    config: &HostConfig,
    synth: &mut S,
    input: R,
    output: W,
) -> Result<RenderReport>
where
    S: Synthesizer + ?Sized,
    R: Read,
    W: Write,
{
    info!(
        "Batch mode: {} Hz, {} channels, {} frames per block",
        config.sample_rate, config.channels, config.block_size
    );
    synth.configure(config.sample_rate as f32, config.block_size)?;
    let applied = config.parameters.apply_to(synth);
    if !config.parameters.is_empty() {
        info!("Applied {applied}/{} parameters", config.parameters.len());
    }

    let mut source = StdinMidiSource::new(input);
    let mut sink = PcmSink::new(output);
    let mut scheduler = BlockScheduler::from_config(config);

    let result = scheduler.run(synth, &mut source, &mut sink);
    debug!("Read {} MIDI messages from input", source.messages_read());
    synth.release();
    result
}

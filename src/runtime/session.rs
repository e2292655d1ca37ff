//! Realtime session: cpal output stream driven by UDP and hardware MIDI.
//!
//! ```text
//!   udp-midi-rx thread ──push──► rtrb ring ─┐
//!   midir port callback ──push──► rtrb ring ─┼─drain──► audio callback ──► device
//!   midir port callback ──push──► rtrb ring ─┘
//! ```
//!
//! The callback only pops from the rings and renders. Shutdown runs in a fixed
//! order: receiver stop and join, hardware inputs closed, stream stop, then
//! synth release.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, info, warn};

use super::{
    collector::{EventCollector, EventReceiver, EVENT_QUEUE_CAPACITY},
    hardware::HardwareMidiInputs,
    receiver::UdpMidiReceiver,
};
use crate::{
    config::HostConfig,
    error::{Error, Result},
    io::{AudioBlock, NoteEvent},
    synth::Synthesizer,
    MAX_BLOCK_SIZE,
};

/// Per-callback state: drains pending events and renders into the device
/// buffer in chunks of at most `block_size` frames.
pub struct CallbackRenderer<S, R> {
    synth: S,
    receiver: R,
    pending: Vec<NoteEvent>,
    block: AudioBlock,
}

impl<S: Synthesizer, R: EventReceiver> CallbackRenderer<S, R> {
    pub fn new(synth: S, receiver: R, channels: usize, block_size: usize) -> Self {
        Self {
            synth,
            receiver,
            pending: Vec::with_capacity(EVENT_QUEUE_CAPACITY),
            block: AudioBlock::new(channels, block_size.max(1)),
        }
    }

    /// Fill an interleaved device buffer. Events queued since the last call
    /// go to the first chunk.
    pub fn process(&mut self, data: &mut [f32]) {
        let channels = self.block.channels();
        if channels == 0 {
            data.fill(0.0);
            return;
        }

        self.pending.clear();
        self.receiver.drain_into(&mut self.pending);

        let block_size = self.block.capacity();
        let total_frames = data.len() / channels;
        let mut frames_written = 0;
        let mut first = true;

        while frames_written < total_frames {
            let frames = (total_frames - frames_written).min(block_size);
            self.block.set_frames(frames);
            self.block.clear();

            let events: &[NoteEvent] = if first { &self.pending } else { &[] };
            self.synth.render(events, &mut self.block);
            first = false;

            let start = frames_written * channels;
            self.block
                .write_interleaved(&mut data[start..start + frames * channels]);
            frames_written += frames;
        }

        // Partial trailing frame, if the host ever hands us one
        data[total_frames * channels..].fill(0.0);
    }

    pub fn synth_mut(&mut self) -> &mut S {
        &mut self.synth
    }

    pub fn into_synth(self) -> S {
        self.synth
    }
}

type SharedRenderer = Arc<Mutex<CallbackRenderer<Box<dyn Synthesizer>, EventCollector>>>;

/// Block size used for the device buffer and the synth in realtime mode.
fn realtime_block_size(config: &HostConfig) -> usize {
    if config.block_size > MAX_BLOCK_SIZE {
        warn!(
            "Block size {} exceeds {MAX_BLOCK_SIZE} in realtime mode, clamping",
            config.block_size
        );
    }
    config.block_size.clamp(1, MAX_BLOCK_SIZE)
}

fn stream_config(config: &HostConfig, buffer_size: cpal::BufferSize) -> Result<cpal::StreamConfig> {
    let channels = cpal::ChannelCount::try_from(config.channels)
        .map_err(|_| Error::Config(format!("{} channels is too many", config.channels)))?;
    Ok(cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size,
    })
}

fn open_stream(
    device: &cpal::Device,
    config: &HostConfig,
    block_size: usize,
    renderer: &SharedRenderer,
) -> Result<cpal::Stream> {
    let build = |buffer_size: cpal::BufferSize| -> Result<cpal::Stream> {
        let stream_config = stream_config(config, buffer_size)?;
        debug!("Stream config: {stream_config:?}");

        let renderer = Arc::clone(renderer);
        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _| match renderer.lock() {
                Ok(mut renderer) => renderer.process(data),
                Err(_) => data.fill(0.0),
            },
            |err| warn!("Audio stream error: {err}"),
            None,
        )?;
        Ok(stream)
    };

    let fixed = cpal::BufferSize::Fixed(block_size as cpal::FrameCount);
    match build(fixed) {
        Ok(stream) => Ok(stream),
        Err(Error::AudioDevice(e)) => {
            warn!("Device rejected a {block_size}-frame buffer ({e}), using its default");
            build(cpal::BufferSize::Default)
        }
        Err(e) => Err(e),
    }
}

pub struct RealtimeSession {
    receiver: Option<UdpMidiReceiver>,
    hardware: Option<HardwareMidiInputs>,
    stream: Option<cpal::Stream>,
    renderer: SharedRenderer,
    sample_rate: u32,
    channels: usize,
    released: bool,
}

impl RealtimeSession {
    /// Configure `synth`, open the default output device and start playing.
    ///
    /// Device and synth failures are fatal, and the synth is released before
    /// the error is returned. A socket that cannot be bound or a MIDI
    /// subsystem that cannot be opened is not: the session plays without
    /// that input.
    pub fn start(config: &HostConfig, mut synth: Box<dyn Synthesizer>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(Error::NoOutputDevice)?;
        info!(
            "Output device: {}",
            device.name().unwrap_or_else(|_| "<unknown>".to_string())
        );
        let default_config = device.default_output_config()?;
        if default_config.sample_format() != cpal::SampleFormat::F32 {
            debug!(
                "Device prefers {:?}, requesting f32 anyway",
                default_config.sample_format()
            );
        }
        // reject before touching the synth
        stream_config(config, cpal::BufferSize::Default)?;

        let block_size = realtime_block_size(config);
        synth.configure(config.sample_rate as f32, block_size)?;
        config.parameters.apply_to(&mut synth);
        for (name, value) in synth.parameters() {
            info!("  {name:<10} {value}");
        }

        let mut collector = EventCollector::new();
        let receiver = match UdpMidiReceiver::start(
            config.udp_addr,
            collector.add_input(EVENT_QUEUE_CAPACITY),
        ) {
            Ok(receiver) => Some(receiver),
            Err(e) => {
                warn!(
                    "Could not listen on {}: {e}; running without UDP MIDI",
                    config.udp_addr
                );
                None
            }
        };
        let hardware = match HardwareMidiInputs::connect_all(&mut collector) {
            Ok(inputs) => Some(inputs),
            Err(e) => {
                warn!("Could not open MIDI subsystem: {e}; running without hardware MIDI");
                None
            }
        };

        let renderer: SharedRenderer = Arc::new(Mutex::new(CallbackRenderer::new(
            synth,
            collector,
            config.channels,
            block_size,
        )));

        // From here on an early return drops the session, which releases the synth
        let mut session = Self {
            receiver,
            hardware,
            stream: None,
            renderer,
            sample_rate: config.sample_rate,
            channels: config.channels,
            released: false,
        };

        let stream = open_stream(&device, config, block_size, &session.renderer)?;
        stream.play()?;
        session.stream = Some(stream);

        info!(
            "Audio running: {} Hz, {} channels, {block_size}-frame blocks",
            config.sample_rate, config.channels
        );

        Ok(session)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Where the session listens for MIDI, if the socket could be bound.
    pub fn udp_addr(&self) -> Option<std::net::SocketAddr> {
        self.receiver.as_ref().map(UdpMidiReceiver::local_addr)
    }

    /// Names of the hardware MIDI inputs that were opened.
    pub fn midi_inputs(&self) -> Vec<String> {
        self.hardware
            .as_ref()
            .map(|inputs| inputs.port_names().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn shutdown(mut self) -> Result<()> {
        self.stop_all()
    }

    fn stop_all(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        if let Some(mut receiver) = self.receiver.take() {
            receiver.stop();
        }
        if let Some(mut hardware) = self.hardware.take() {
            hardware.close();
        }

        let mut result = Ok(());
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                result = Err(Error::from(e));
            }
            drop(stream);
        }

        match self.renderer.lock() {
            Ok(mut renderer) => renderer.synth_mut().release(),
            Err(poisoned) => poisoned.into_inner().synth_mut().release(),
        }
        info!("Realtime session stopped");

        result
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        if let Err(e) = self.stop_all() {
            warn!("Error while stopping audio: {e}");
        }
    }
}

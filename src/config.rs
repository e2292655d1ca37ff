//! Host configuration and command-line parsing.

use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::{
    engine::{sustain, SampleBudget},
    error::{Error, Result},
    synth::ParameterSet,
};

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_BLOCK_SIZE: usize = 512;
pub const DEFAULT_CHANNELS: usize = 2;
pub const DEFAULT_UDP_PORT: u16 = 9999;

pub const USAGE: &str = "\
Usage: saavy-host [OPTIONS]

Renders MIDI to raw PCM. Reads 3-byte MIDI messages from stdin and writes
native-endian f32 interleaved samples to stdout when stdin is not a terminal
(or --stdin is given). Otherwise plays live, driven by MIDI over UDP.

Options:
  --stdin                 Force batch mode
  --duration <seconds>    Stop after this much audio (0 = until input ends)
  --samplerate <hz>       Sample rate [default: 44100]
  --blocksize <frames>    Frames per render block [default: 512]
  --channels <n>          Output channels [default: 2]
  --param <Name=Value>    Set a synth parameter (repeatable)
  --sustain <seconds>     Hold the last note this long after input ends
  --udp <addr:port>       Realtime MIDI listen address [default: 127.0.0.1:9999]
  -h, --help              Print this help
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    #[default]
    Batch,
    Realtime,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostConfig {
    pub mode: Mode,
    /// Seconds of audio to render; `0` renders until input ends.
    pub duration: f64,
    pub sample_rate: u32,
    pub block_size: usize,
    pub channels: usize,
    pub parameters: ParameterSet,
    /// Seconds a note is held after batch input ends.
    pub sustain: f64,
    pub udp_addr: SocketAddr,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Batch,
            duration: 0.0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            channels: DEFAULT_CHANNELS,
            parameters: ParameterSet::new(),
            sustain: sustain::DEFAULT_SUSTAIN_SECONDS,
            udp_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_UDP_PORT)),
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(HostConfig),
    Help,
}

impl HostConfig {
    /// Parse arguments (without the program name). Mode is batch when
    /// `--stdin` is given or stdin is not a terminal.
    pub fn parse<I, S>(args: I, stdin_is_terminal: bool) -> Result<Command>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = HostConfig::default();
        let mut force_stdin = false;
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            let (name, inline) = match arg.split_once('=') {
                Some((name, value)) if name.starts_with("--") => {
                    (name.to_string(), Some(value.to_string()))
                }
                _ => (arg.clone(), None),
            };

            match name.as_str() {
                "-h" | "--help" => return Ok(Command::Help),
                "--stdin" => {
                    if inline.is_some() {
                        return Err(Error::Config("--stdin takes no value".into()));
                    }
                    force_stdin = true;
                }
                "--duration" => {
                    let value = value_for(&name, inline, &mut args)?;
                    config.duration = parse_number(&name, &value)?;
                    if !(config.duration >= 0.0) || !config.duration.is_finite() {
                        return Err(Error::Config(format!("--duration must be >= 0, got {value}")));
                    }
                }
                "--samplerate" => {
                    let value = value_for(&name, inline, &mut args)?;
                    config.sample_rate = parse_nonzero(&name, &value)?;
                }
                "--blocksize" => {
                    let value = value_for(&name, inline, &mut args)?;
                    config.block_size = parse_nonzero(&name, &value)?;
                }
                "--channels" => {
                    let value = value_for(&name, inline, &mut args)?;
                    config.channels = parse_nonzero(&name, &value)?;
                }
                "--param" => {
                    let value = value_for(&name, inline, &mut args)?;
                    config.parameters.insert_assignment(&value)?;
                }
                "--sustain" => {
                    let value = value_for(&name, inline, &mut args)?;
                    config.sustain = parse_number(&name, &value)?;
                    if !(config.sustain >= 0.0) || !config.sustain.is_finite() {
                        return Err(Error::Config(format!("--sustain must be >= 0, got {value}")));
                    }
                }
                "--udp" => {
                    let value = value_for(&name, inline, &mut args)?;
                    config.udp_addr = value.parse().map_err(|_| {
                        Error::Config(format!("--udp expects addr:port, got {value:?}"))
                    })?;
                }
                other => return Err(Error::Config(format!("unknown option {other:?}"))),
            }
        }

        config.mode = if force_stdin || !stdin_is_terminal {
            Mode::Batch
        } else {
            Mode::Realtime
        };

        Ok(Command::Run(config))
    }

    pub fn sample_budget(&self) -> SampleBudget {
        SampleBudget::from_duration(self.duration, self.sample_rate)
    }

    /// Sustain time as a whole number of blocks at this rate and block size.
    pub fn sustain_blocks(&self) -> u32 {
        sustain::blocks_for_duration(self.sustain, self.sample_rate, self.block_size)
    }
}

fn value_for<I: Iterator<Item = String>>(
    name: &str,
    inline: Option<String>,
    rest: &mut I,
) -> Result<String> {
    match inline {
        Some(value) => Ok(value),
        None => rest
            .next()
            .ok_or_else(|| Error::Config(format!("{name} requires a value"))),
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{name} expects a number, got {value:?}")))
}

fn parse_nonzero<T: FromStr + Default + PartialEq>(name: &str, value: &str) -> Result<T> {
    let parsed: T = parse_number(name, value)?;
    if parsed == T::default() {
        return Err(Error::Config(format!("{name} must be greater than zero")));
    }
    Ok(parsed)
}

//! Error type shared by the render engine, the realtime session and the host binary.
//!
//! MIDI decode failures are deliberately not part of this enum: they are
//! definitional, and each caller decides whether one ends a stream or is dropped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no default output device available")]
    NoOutputDevice,

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("MIDI device error: {0}")]
    MidiDevice(String),

    #[error("synth setup failed: {0}")]
    Synth(String),

    #[error("invalid config: {0}")]
    Config(String),
}

impl From<cpal::DefaultStreamConfigError> for Error {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        Error::AudioDevice(e.to_string())
    }
}

impl From<cpal::BuildStreamError> for Error {
    fn from(e: cpal::BuildStreamError) -> Self {
        Error::AudioDevice(e.to_string())
    }
}

impl From<cpal::PlayStreamError> for Error {
    fn from(e: cpal::PlayStreamError) -> Self {
        Error::AudioDevice(e.to_string())
    }
}

impl From<cpal::PauseStreamError> for Error {
    fn from(e: cpal::PauseStreamError) -> Self {
        Error::AudioDevice(e.to_string())
    }
}

impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::MidiDevice(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

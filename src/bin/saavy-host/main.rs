//! saavy-host - render MIDI to raw PCM, or play it live from UDP
//!
//! Batch:    cat notes.mid.raw | saavy-host --duration 1 > out.f32
//! Realtime: saavy-host --udp 127.0.0.1:9999

use std::io::{self, BufWriter, IsTerminal};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use tracing::info;
use tracing_subscriber::EnvFilter;

use saavy_host::{
    config::{Command, HostConfig, Mode, USAGE},
    engine,
    runtime::RealtimeSession,
    synth::{MonoSynth, Synthesizer},
};

fn main() -> EyreResult<()> {
    color_eyre::install()?;

    // stdout carries PCM in batch mode, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = match HostConfig::parse(std::env::args().skip(1), io::stdin().is_terminal())? {
        Command::Run(config) => config,
        Command::Help => {
            eprint!("{USAGE}");
            return Ok(());
        }
    };

    match config.mode {
        Mode::Batch => run_batch(&config),
        Mode::Realtime => run_realtime(&config),
    }
}

fn run_batch(config: &HostConfig) -> EyreResult<()> {
    let mut synth = MonoSynth::new();
    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());

    let report = engine::render_batch(config, &mut synth, stdin, stdout)
        .wrap_err("batch render failed")?;
    info!(
        "Wrote {} bytes ({} samples per channel)",
        report.bytes_written, report.samples
    );
    Ok(())
}

fn run_realtime(config: &HostConfig) -> EyreResult<()> {
    let synth: Box<dyn Synthesizer> = Box::new(MonoSynth::new());
    let session =
        RealtimeSession::start(config, synth).wrap_err("failed to start realtime session")?;

    eprintln!("=== saavy-host ===");
    eprintln!("Sample rate: {} Hz", session.sample_rate());
    eprintln!("Channels: {}", session.channels());
    match session.udp_addr() {
        Some(addr) => eprintln!("MIDI: udp://{addr} (3-byte messages)"),
        None => eprintln!("MIDI: UDP unavailable"),
    }
    for name in session.midi_inputs() {
        eprintln!("MIDI: {name}");
    }
    eprintln!("Press Enter to stop...");

    // EOF on stdin also ends the session
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    session.shutdown().wrap_err("error while stopping session")?;
    Ok(())
}

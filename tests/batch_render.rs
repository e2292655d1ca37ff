use std::io::Cursor;

use saavy_host::{
    config::{Command, HostConfig},
    engine::{self, RenderReport},
    io::pcm::{samples_from_bytes, BYTES_PER_SAMPLE},
    synth::MonoSynth,
};

fn config(args: &[&str]) -> HostConfig {
    match HostConfig::parse(args.iter().copied(), false).unwrap() {
        Command::Run(config) => config,
        Command::Help => panic!("unexpected help"),
    }
}

fn render(config: &HostConfig, midi: &[u8]) -> (RenderReport, Vec<u8>) {
    let mut synth = MonoSynth::new();
    let mut out = Vec::new();
    let report = engine::render_batch(config, &mut synth, Cursor::new(midi.to_vec()), &mut out)
        .unwrap();
    (report, out)
}

/// Peak level of each block, across all channels.
fn block_peaks(bytes: &[u8], config: &HostConfig) -> Vec<f32> {
    samples_from_bytes(bytes)
        .chunks(config.block_size * config.channels)
        .map(|block| block.iter().fold(0.0f32, |peak, s| peak.max(s.abs())))
        .collect()
}

#[test]
fn middle_c_for_one_second() {
    let config = config(&["--duration", "1.0"]);
    let (report, bytes) = render(&config, &[0x90, 0x3C, 0x64]);

    assert_eq!(bytes.len(), 44_544 * 2 * 4);
    assert_eq!(report.blocks, 87);
    assert_eq!(report.bytes_written, bytes.len() as u64);

    let peaks = block_peaks(&bytes, &config);
    assert!(peaks.iter().all(|&p| p > 0.0));
    assert!(peaks.iter().all(|&p| p <= 1.0));
}

#[test]
fn output_length_follows_duration() {
    for (duration, block_size, channels) in [("0.5", 256, 1), ("0.01", 512, 2), ("2", 1000, 3)] {
        let config = config(&[
            "--duration",
            duration,
            "--blocksize",
            &block_size.to_string(),
            "--channels",
            &channels.to_string(),
        ]);
        let (_, bytes) = render(&config, &[0x90, 60, 100]);

        let d: f64 = duration.parse().unwrap();
        let blocks = (d * 44_100.0 / block_size as f64).ceil() as usize;
        assert_eq!(bytes.len(), blocks * block_size * channels * BYTES_PER_SAMPLE);
    }
}

#[test]
fn held_note_sounds_through_sustain_then_stops() {
    let config = config(&["--sustain", "0.1161", "--duration", "0.5"]);
    assert_eq!(config.sustain_blocks(), 10);

    let (_, bytes) = render(&config, &[0x90, 60, 100]);
    let peaks = block_peaks(&bytes, &config);

    // note on plus ten re-triggers
    assert!(peaks[..=10].iter().all(|&p| p > 0.1));
    // release tail fits inside the next block, then silence
    assert!(peaks[12..].iter().all(|&p| p == 0.0));
}

#[test]
fn unbounded_render_ends_after_release() {
    let config = config(&["--sustain", "0.1161"]);
    let (report, _) = render(&config, &[0x90, 60, 100]);

    // note on, ten re-triggers, release
    assert_eq!(report.blocks, 12);
    assert_eq!(report.retriggers, 10);
}

#[test]
fn note_off_stops_sustain() {
    let config = config(&["--duration", "0.5"]);
    let (report, bytes) = render(&config, &[0x90, 60, 100, 0x80, 60, 0]);

    assert_eq!(report.retriggers, 0);
    let peaks = block_peaks(&bytes, &config);
    assert!(peaks[2..].iter().all(|&p| p == 0.0));
}

#[test]
fn empty_input_is_one_silent_block() {
    let config = config(&[]);
    let (report, bytes) = render(&config, &[]);

    assert_eq!(report.blocks, 1);
    assert!(samples_from_bytes(&bytes).iter().all(|&s| s == 0.0));
}

#[test]
fn program_change_is_consumed_without_sound() {
    let config = config(&["--duration", "0.05"]);
    let (report, bytes) = render(&config, &[0xC0, 5, 0x90, 60, 100]);

    assert_eq!(report.events_read, 1);
    let peaks = block_peaks(&bytes, &config);
    assert_eq!(peaks[0], 0.0);
    assert!(peaks[1] > 0.0);
}

#[test]
fn truncated_tail_is_dropped() {
    let config = config(&[]);
    let (report, bytes) = render(&config, &[0x90, 60]);

    assert_eq!(report.events_read, 0);
    assert_eq!(report.blocks, 1);
    assert!(samples_from_bytes(&bytes).iter().all(|&s| s == 0.0));
}

#[test]
fn garbage_closes_input_but_keeps_held_note() {
    let config = config(&["--duration", "0.1"]);
    let (report, bytes) = render(&config, &[0x90, 60, 100, 0x42, 0x90, 64, 100]);

    assert_eq!(report.events_read, 1);
    assert!(block_peaks(&bytes, &config).iter().all(|&p| p > 0.0));
}

#[test]
fn parameters_reach_the_synth() {
    let silent = config(&["--duration", "0.05", "--param", "Gain=0"]);
    let (_, bytes) = render(&silent, &[0x90, 60, 100]);
    assert!(samples_from_bytes(&bytes).iter().all(|&s| s == 0.0));

    let unknown = config(&["--duration", "0.05", "--param", "Resonance=3"]);
    let (_, bytes) = render(&unknown, &[0x90, 60, 100]);
    assert!(samples_from_bytes(&bytes).iter().any(|&s| s != 0.0));
}

#[test]
fn channels_carry_the_same_signal() {
    let config = config(&["--duration", "0.05", "--channels", "2"]);
    let (_, bytes) = render(&config, &[0x90, 69, 127]);

    let samples = samples_from_bytes(&bytes);
    assert!(samples.chunks_exact(2).all(|frame| frame[0] == frame[1]));
}

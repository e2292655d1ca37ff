//! Benchmarks for a full batch render, MIDI bytes in, PCM bytes out.

use std::hint::black_box;
use std::io::{self, Cursor};

use criterion::{BenchmarkId, Criterion};
use saavy_host::{config::HostConfig, engine, synth::MonoSynth};

use crate::BLOCK_SIZES;

pub fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/batch");
    let midi = [0x90u8, 60, 100];

    for &size in BLOCK_SIZES {
        let config = HostConfig {
            duration: 1.0,
            block_size: size,
            ..HostConfig::default()
        };

        group.bench_with_input(BenchmarkId::new("one_second", size), &size, |b, _| {
            b.iter(|| {
                let mut synth = MonoSynth::new();
                engine::render_batch(&config, &mut synth, Cursor::new(black_box(midi)), io::sink())
            })
        });
    }

    group.finish();
}

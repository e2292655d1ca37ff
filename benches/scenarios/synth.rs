//! Benchmarks for one synth block, direct and through the realtime callback.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_host::{
    io::{AudioBlock, NoteEvent},
    runtime::{event_queue, CallbackRenderer},
    synth::{MonoSynth, Synthesizer},
    MAX_BLOCK_SIZE,
};

use crate::BLOCK_SIZES;

const NOTE_ON: NoteEvent = NoteEvent::NoteOn {
    channel: 1,
    note: 57,
    velocity: 0.8,
};

fn held_synth() -> MonoSynth {
    let mut synth = MonoSynth::new();
    let _ = synth.configure(44_100.0, MAX_BLOCK_SIZE);
    synth.set_parameter("Waveform", 2.0);
    synth
}

pub fn bench_synth(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/synth");

    for &size in BLOCK_SIZES {
        let mut synth = held_synth();
        let mut block = AudioBlock::new(2, size);
        synth.render(&[NOTE_ON], &mut block);
        let no_events: &[NoteEvent] = &[];
        group.bench_with_input(BenchmarkId::new("mono_block", size), &size, |b, _| {
            b.iter(|| synth.render(black_box(no_events), black_box(&mut block)))
        });

        let (_tx, rx) = event_queue(64);
        let mut synth = held_synth();
        synth.render(&[NOTE_ON], &mut AudioBlock::new(2, size));
        let mut renderer = CallbackRenderer::new(synth, rx, 2, size);
        let mut data = vec![0.0f32; size * 2];
        group.bench_with_input(BenchmarkId::new("callback", size), &size, |b, _| {
            b.iter(|| renderer.process(black_box(&mut data)))
        });
    }

    group.finish();
}

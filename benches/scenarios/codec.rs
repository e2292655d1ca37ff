//! Benchmarks for MIDI decoding, as the stdin source and UDP receiver run it.

use std::hint::black_box;
use std::io::Cursor;

use criterion::{BenchmarkId, Criterion};
use saavy_host::io::{midi, MidiSource, SourceRead, StdinMidiSource};

pub fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/codec");

    group.bench_function("decode_note_on", |b| {
        b.iter(|| midi::decode(black_box(&[0x90u8, 60, 100][..])))
    });

    for &count in &[16usize, 256] {
        let stream: Vec<u8> = (0..count)
            .flat_map(|i| [0x90, (i % 128) as u8, 100])
            .collect();
        group.bench_with_input(BenchmarkId::new("stdin_source", count), &count, |b, _| {
            b.iter(|| {
                let mut source = StdinMidiSource::new(Cursor::new(stream.as_slice()));
                let mut events = 0;
                while let SourceRead::Event(_) = source.read_next() {
                    events += 1;
                }
                black_box(events)
            })
        });
    }

    group.finish();
}

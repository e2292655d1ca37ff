//! Scenario benchmarks: the synth and the batch loop as the host runs them.

mod batch;
mod codec;
mod synth;

pub use batch::bench_batch;
pub use codec::bench_codec;
pub use synth::bench_synth;

// Purpose - external interfaces: MIDI in, PCM out, and the block buffer between them

pub mod block;
pub mod midi;
pub mod pcm;
pub mod source;

pub use block::AudioBlock;
pub use midi::{MalformedMessage, NoteEvent};
pub use pcm::PcmSink;
pub use source::{MidiSource, SourceRead, StdinMidiSource};

//! Pull-based MIDI input for batch rendering.

use std::io::{ErrorKind, Read};

use tracing::debug;

use super::midi::{self, MalformedMessage, NoteEvent};

/// Outcome of a single pull from a [`MidiSource`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceRead {
    Event(NoteEvent),
    /// Nothing usable for this block, but the source is still open.
    Pending,
    EndOfStream,
    Malformed(MalformedMessage),
}

/// Anything the block scheduler can pull events from.
pub trait MidiSource {
    fn read_next(&mut self) -> SourceRead;
}

/// Reads raw MIDI short messages from a byte stream (stdin in the host binary).
///
/// A message cut short by the end of the stream is discarded and reported as
/// end of stream, not as an error.
pub struct StdinMidiSource<R> {
    reader: R,
    messages_read: usize,
}

impl<R: Read> StdinMidiSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            messages_read: 0,
        }
    }

    /// Messages consumed so far, including unsupported ones.
    pub fn messages_read(&self) -> usize {
        self.messages_read
    }

    /// Fill as much of `buf` as the stream allows. Read errors count as the
    /// end of the stream.
    fn fill(&mut self, buf: &mut [u8]) -> usize {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("MIDI input read failed, treating as end of stream: {e}");
                    break;
                }
            }
        }
        filled
    }
}

impl<R: Read> MidiSource for StdinMidiSource<R> {
    fn read_next(&mut self) -> SourceRead {
        let mut buf = [0u8; 3];
        if self.fill(&mut buf[..1]) == 0 {
            return SourceRead::EndOfStream;
        }

        let status = buf[0];
        let Some(needed) = midi::data_len(status) else {
            return SourceRead::Malformed(MalformedMessage::UnknownStatus(status));
        };

        if self.fill(&mut buf[1..=needed]) != needed {
            return SourceRead::EndOfStream;
        }
        self.messages_read += 1;

        match midi::decode(&buf[..=needed]) {
            Ok(NoteEvent::Unsupported { .. }) => SourceRead::Pending,
            Ok(event) => SourceRead::Event(event),
            Err(e) => SourceRead::Malformed(e),
        }
    }
}

//! Raw PCM output.
//!
//! Each sample is a 4-byte IEEE-754 float in native byte order, interleaved by
//! frame. There is no header or trailer; consumers derive length from the
//! byte count and the agreed sample rate / channel count.

use std::io::{self, Write};

pub const BYTES_PER_SAMPLE: usize = std::mem::size_of::<f32>();

use super::block::AudioBlock;

pub struct PcmSink<W: Write> {
    writer: W,
    scratch: Vec<u8>,
    bytes_written: u64,
    blocks_written: u64,
}

impl<W: Write> PcmSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            scratch: Vec::new(),
            bytes_written: 0,
            blocks_written: 0,
        }
    }

    pub fn write_block(&mut self, block: &AudioBlock) -> io::Result<()> {
        let channels = block.channels();
        let frames = block.frames();

        self.scratch.clear();
        self.scratch.reserve(channels * frames * BYTES_PER_SAMPLE);
        for i in 0..frames {
            for ch in 0..channels {
                self.scratch
                    .extend_from_slice(&block.channel(ch)[i].to_ne_bytes());
            }
        }

        self.writer.write_all(&self.scratch)?;
        self.bytes_written += self.scratch.len() as u64;
        self.blocks_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Decode a native-endian PCM byte stream back into samples.
pub fn samples_from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

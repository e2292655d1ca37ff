/// Planar `channels x frames` sample buffer handed to the synthesizer.
///
/// Storage is allocated once for `capacity` frames per channel. The realtime
/// callback narrows the active length with [`AudioBlock::set_frames`] instead
/// of reallocating.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    buffers: Vec<Vec<f32>>,
    frames: usize,
}

impl AudioBlock {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            buffers: vec![vec![0.0; frames]; channels],
            frames,
        }
    }

    pub fn channels(&self) -> usize {
        self.buffers.len()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn capacity(&self) -> usize {
        self.buffers.first().map_or(0, Vec::len)
    }

    /// Change the active frame count, clamped to the allocated capacity.
    pub fn set_frames(&mut self, frames: usize) {
        self.frames = frames.min(self.capacity());
    }

    pub fn clear(&mut self) {
        let frames = self.frames;
        for buf in &mut self.buffers {
            buf[..frames].fill(0.0);
        }
    }

    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.buffers[ch][..self.frames]
    }

    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        let frames = self.frames;
        &mut self.buffers[ch][..frames]
    }

    /// Copy channel 0 into every other channel.
    pub fn copy_first_to_all(&mut self) {
        let frames = self.frames;
        if let Some((first, rest)) = self.buffers.split_first_mut() {
            for buf in rest {
                buf[..frames].copy_from_slice(&first[..frames]);
            }
        }
    }

    /// Interleave the active frames into `out` (frame-major: all channels for
    /// frame 0, then frame 1, ...). Returns the number of frames written.
    pub fn write_interleaved(&self, out: &mut [f32]) -> usize {
        let channels = self.channels();
        if channels == 0 {
            return 0;
        }
        let frames = self.frames.min(out.len() / channels);
        for (i, frame) in out.chunks_exact_mut(channels).take(frames).enumerate() {
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample = self.buffers[ch][i];
            }
        }
        frames
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.buffers
            .iter()
            .flat_map(|buf| buf[..self.frames].iter())
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    pub fn is_silent(&self) -> bool {
        self.peak() == 0.0
    }
}

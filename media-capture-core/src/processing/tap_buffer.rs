use std::collections::VecDeque;

/// Bounded FIFO of mono samples sitting between a stream's audio callback
/// and the mixing graph's render pass.
///
/// Wrap in `Arc<parking_lot::Mutex<TapBuffer>>` for cross-thread access.
/// Overflow drops the oldest samples and counts them.
#[derive(Debug)]
pub struct TapBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
    dropped: u64,
}

impl TapBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Append samples, dropping the oldest on overflow.
    pub fn push(&mut self, samples: &[f32]) {
        if samples.len() >= self.capacity {
            self.dropped += (self.samples.len() + samples.len() - self.capacity) as u64;
            self.samples.clear();
            self.samples.extend(&samples[samples.len() - self.capacity..]);
            return;
        }

        let overflow = (self.samples.len() + samples.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.samples.drain(..overflow);
            self.dropped += overflow as u64;
        }
        self.samples.extend(samples);
    }

    /// Remove exactly `frames` samples; missing samples are silence.
    pub fn pull_block(&mut self, frames: usize) -> Vec<f32> {
        let available = frames.min(self.samples.len());
        let mut block: Vec<f32> = self.samples.drain(..available).collect();
        block.resize(frames, 0.0);
        block
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples discarded because the render pass fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

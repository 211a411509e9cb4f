use crate::models::media::OutputChunk;

/// Encoded output of one session, in arrival order.
///
/// Spans pauses and source switches. Empty fragments are never stored.
#[derive(Debug, Default, Clone)]
pub struct ChunkSequence {
    chunks: Vec<OutputChunk>,
    total_bytes: u64,
}

impl ChunkSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Returns its sequence number, or None if it was empty.
    pub fn push(&mut self, data: Vec<u8>) -> Option<u64> {
        if data.is_empty() {
            return None;
        }
        let sequence = self.chunks.len() as u64;
        self.total_bytes += data.len() as u64;
        self.chunks.push(OutputChunk { sequence, data });
        Some(sequence)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputChunk> {
        self.chunks.iter()
    }

    pub fn chunks(&self) -> &[OutputChunk] {
        &self.chunks
    }

    /// All fragments joined in order.
    pub fn concatenated(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_bytes as usize);
        for chunk in &self.chunks {
            out.extend_from_slice(&chunk.data);
        }
        out
    }
}

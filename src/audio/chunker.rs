//! # Chunk Assembly
//!
//! Converts the unbounded stream of arbitrarily-sized byte fragments a
//! websocket client sends into fixed-size chunks the recognizer accepts.
//!
//! ## Key Properties:
//! - **Lossless FIFO**: bytes are never reordered, duplicated, or dropped
//!   while the stream is open; extraction always removes from the front
//! - **Exact sizing**: every yielded chunk is exactly `min_chunk_bytes`
//!   long; an undersized tail is never yielded
//! - **Remainder policy**: bytes left over when a session closes are
//!   discarded rather than fed as a short, low-quality chunk
//!
//! The recognizer is stateful and chunk-order-dependent. It raises no
//! error for skipped or reordered chunks, it just silently degrades, so
//! order and completeness are enforced here and nowhere else.

use byteorder::{ByteOrder, LittleEndian};
use std::collections::VecDeque;

/// A fixed-length block of raw PCM bytes, sized for one recognizer feed.
///
/// Produced by [`ChunkAssembler`], consumed exactly once by an engine,
/// then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    bytes: Vec<u8>,
}

impl AudioChunk {
    /// The raw little-endian PCM bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode the chunk as 16-bit signed little-endian samples.
    ///
    /// Chunk sizes are validated to be even at configuration time, so
    /// every byte participates in exactly one sample.
    pub fn samples(&self) -> Vec<i16> {
        let mut samples = vec![0i16; self.bytes.len() / 2];
        LittleEndian::read_i16_into(&self.bytes[..samples.len() * 2], &mut samples);
        samples
    }
}

/// Buffers inbound byte fragments and yields exact-size [`AudioChunk`]s.
///
/// Owned exclusively by one session; mutated only by that session's
/// receive loop. Not shared, not locked.
#[derive(Debug)]
pub struct ChunkAssembler {
    buffer: VecDeque<u8>,
    chunk_size: usize,
    total_bytes: u64,
}

impl ChunkAssembler {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(chunk_size * 2),
            chunk_size,
            total_bytes: 0,
        }
    }

    /// Append one inbound fragment.
    ///
    /// Fragments of any size are accepted; ones smaller than a chunk are
    /// buffered and contribute to future chunks.
    pub fn push(&mut self, fragment: &[u8]) {
        self.total_bytes += fragment.len() as u64;
        self.buffer.extend(fragment.iter().copied());
    }

    /// Extract the next full chunk from the front of the buffer, if one
    /// is available.
    pub fn next_chunk(&mut self) -> Option<AudioChunk> {
        if self.buffer.len() < self.chunk_size {
            return None;
        }

        let bytes: Vec<u8> = self.buffer.drain(..self.chunk_size).collect();
        Some(AudioChunk { bytes })
    }

    /// Number of buffered bytes not yet extracted.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Total bytes pushed over the lifetime of this assembler.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Remove and return whatever undersized tail is left.
    ///
    /// Called on session close. The remainder is discarded by the caller,
    /// never fed to the engine; it is returned so the close path can log
    /// how much was dropped.
    pub fn take_remainder(&mut self) -> Vec<u8> {
        self.buffer.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_all(assembler: &mut ChunkAssembler) -> Vec<AudioChunk> {
        let mut chunks = Vec::new();
        while let Some(chunk) = assembler.next_chunk() {
            chunks.push(chunk);
        }
        chunks
    }

    #[test]
    fn test_chunk_integrity_exact_multiple() {
        // Total input that is an exact multiple of the chunk size must be
        // reproduced byte-for-byte, in order, with no remainder.
        let mut assembler = ChunkAssembler::new(8);
        let input: Vec<u8> = (0..32).collect();
        assembler.push(&input[..10]);
        assembler.push(&input[10..17]);
        assembler.push(&input[17..]);

        let chunks = drain_all(&mut assembler);
        assert_eq!(chunks.len(), 4);
        for chunk in &chunks {
            assert_eq!(chunk.len(), 8);
        }

        let rejoined: Vec<u8> = chunks.iter().flat_map(|c| c.bytes().to_vec()).collect();
        assert_eq!(rejoined, input);
        assert_eq!(assembler.pending_bytes(), 0);
    }

    #[test]
    fn test_byte_at_a_time_matches_single_fragment() {
        // Buffering is associative: feeding one byte at a time yields the
        // same chunks as one large fragment of the same content.
        let input: Vec<u8> = (0u8..=255).cycle().take(700).collect();

        let mut bulk = ChunkAssembler::new(256);
        bulk.push(&input);
        let bulk_chunks = drain_all(&mut bulk);

        let mut trickle = ChunkAssembler::new(256);
        let mut trickle_chunks = Vec::new();
        for byte in &input {
            trickle.push(std::slice::from_ref(byte));
            while let Some(chunk) = trickle.next_chunk() {
                trickle_chunks.push(chunk);
            }
        }

        assert_eq!(bulk_chunks, trickle_chunks);
        assert_eq!(bulk.pending_bytes(), trickle.pending_bytes());
        assert_eq!(trickle.pending_bytes(), 700 % 256);
    }

    #[test]
    fn test_no_undersized_chunk_is_yielded() {
        let mut assembler = ChunkAssembler::new(8000);
        assembler.push(&vec![0u8; 7999]);
        assert!(assembler.next_chunk().is_none());
        assembler.push(&[0u8]);
        let chunk = assembler.next_chunk().expect("one full chunk");
        assert_eq!(chunk.len(), 8000);
        assert!(assembler.next_chunk().is_none());
    }

    #[test]
    fn test_remainder_is_surrendered_not_chunked() {
        let mut assembler = ChunkAssembler::new(8000);
        assembler.push(&vec![7u8; 5000]);
        assert!(assembler.next_chunk().is_none());

        let remainder = assembler.take_remainder();
        assert_eq!(remainder.len(), 5000);
        assert_eq!(assembler.pending_bytes(), 0);
        assert!(assembler.next_chunk().is_none());
    }

    #[test]
    fn test_total_bytes_accounting() {
        let mut assembler = ChunkAssembler::new(4);
        assembler.push(&[1, 2, 3]);
        assembler.push(&[4, 5]);
        assert_eq!(assembler.total_bytes(), 5);
        assert_eq!(assembler.pending_bytes(), 5);
        let _ = assembler.next_chunk();
        // Extraction does not change the lifetime total.
        assert_eq!(assembler.total_bytes(), 5);
        assert_eq!(assembler.pending_bytes(), 1);
    }

    #[test]
    fn test_sample_decoding_is_little_endian() {
        let mut assembler = ChunkAssembler::new(4);
        // 0x0001 and -2 (0xFFFE) as little-endian i16.
        assembler.push(&[0x01, 0x00, 0xFE, 0xFF]);
        let chunk = assembler.next_chunk().unwrap();
        assert_eq!(chunk.samples(), vec![1i16, -2i16]);
    }
}

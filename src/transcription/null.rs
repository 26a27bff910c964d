//! Null recognition engine.
//!
//! Consumes chunks, counts them, and never produces text. Used when the
//! crate is built without the `vosk` feature so every transport, session,
//! and assembler path still runs end to end, and in smoke tests that do
//! not care about recognition output.

use crate::audio::chunker::AudioChunk;
use crate::transcription::engine::{
    EngineOptions, EngineOutcome, PartialResult, RecognitionEngine,
};
use anyhow::Result;
use tracing::trace;

pub struct NullEngine {
    options: EngineOptions,
    chunks_fed: u64,
}

impl NullEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            chunks_fed: 0,
        }
    }

    pub fn chunks_fed(&self) -> u64 {
        self.chunks_fed
    }
}

impl RecognitionEngine for NullEngine {
    fn name(&self) -> &str {
        "null"
    }

    fn feed(&mut self, chunk: &AudioChunk) -> Result<EngineOutcome> {
        self.chunks_fed += 1;
        trace!(
            chunk_bytes = chunk.len(),
            chunks_fed = self.chunks_fed,
            sample_rate = self.options.sample_rate,
            "null engine consumed chunk"
        );
        // Empty partials are suppressed upstream, so the client hears nothing.
        Ok(EngineOutcome::InProgress(PartialResult::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::chunker::ChunkAssembler;

    fn chunk_of(bytes: usize) -> AudioChunk {
        let mut assembler = ChunkAssembler::new(bytes);
        assembler.push(&vec![0u8; bytes]);
        assembler.next_chunk().unwrap()
    }

    #[test]
    fn test_null_engine_counts_chunks() {
        let mut engine = NullEngine::new(EngineOptions::default());
        for _ in 0..3 {
            engine.feed(&chunk_of(16)).unwrap();
        }
        assert_eq!(engine.chunks_fed(), 3);
    }

    #[test]
    fn test_null_engine_only_emits_empty_partials() {
        let mut engine = NullEngine::new(EngineOptions::default());
        match engine.feed(&chunk_of(16)).unwrap() {
            EngineOutcome::InProgress(partial) => assert!(partial.is_empty_text()),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}

//! Vosk-backed recognition engine.
//!
//! Wraps one `vosk::Recognizer` per session. The recognizer is stateful:
//! it accumulates audio across feeds until it detects an utterance
//! boundary, returns the final result for that segment, and resets
//! itself for the next one.

use crate::audio::chunker::AudioChunk;
use crate::transcription::engine::{
    EngineOptions, EngineOutcome, FinalResult, PartialResult, RecognitionEngine, WordInfo,
};
use anyhow::{anyhow, Result};
use tracing::debug;
use vosk::{DecodingState, Model, Recognizer};

pub struct VoskEngine {
    recognizer: Recognizer,
}

impl VoskEngine {
    /// Build a fresh recognizer against the shared model.
    ///
    /// Word timestamps and partial-word reporting are fixed here for the
    /// lifetime of the session; they are never reconfigured mid-stream.
    pub fn new(model: &Model, options: EngineOptions) -> Result<Self> {
        let mut recognizer = Recognizer::new(model, options.sample_rate as f32)
            .ok_or_else(|| anyhow!("failed to create recognizer from loaded model"))?;

        recognizer.set_words(options.words);
        recognizer.set_partial_words(options.partial_words);

        Ok(Self { recognizer })
    }
}

impl RecognitionEngine for VoskEngine {
    fn name(&self) -> &str {
        "vosk"
    }

    fn feed(&mut self, chunk: &AudioChunk) -> Result<EngineOutcome> {
        let samples = chunk.samples();

        let state = self
            .recognizer
            .accept_waveform(&samples)
            .map_err(|err| anyhow!("recognizer rejected waveform: {:?}", err))?;

        match state {
            DecodingState::Finalized => {
                let complete = self.recognizer.result();
                let single = complete
                    .single()
                    .ok_or_else(|| anyhow!("recognizer returned a non-single result"))?;

                let words = single
                    .result
                    .iter()
                    .map(|word| WordInfo {
                        word: word.word.to_string(),
                        start: word.start as f64,
                        end: word.end as f64,
                        conf: word.conf as f64,
                    })
                    .collect();

                Ok(EngineOutcome::SegmentComplete(FinalResult {
                    text: single.text.to_string(),
                    result: words,
                }))
            }
            DecodingState::Running => {
                let partial = self.recognizer.partial_result();
                Ok(EngineOutcome::InProgress(PartialResult {
                    partial: partial.partial.to_string(),
                }))
            }
            DecodingState::Failed => Err(anyhow!("recognizer failed to decode chunk")),
        }
    }
}

impl Drop for VoskEngine {
    fn drop(&mut self) {
        // The recognizer's native resources are released with it; this log
        // marks the single disposal point on the session close path.
        debug!("vosk recognizer disposed");
    }
}

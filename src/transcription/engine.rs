//! # Recognition Engine Interface
//!
//! The seam between the streaming session and whatever recognition
//! backend is compiled in. Sessions only ever see the
//! [`RecognitionEngine`] trait, so backends can be swapped (real model,
//! null engine, scripted test double) without touching session code.
//!
//! ## Engine Contract:
//! - Engines are **stateful and chunk-order-dependent**: feed chunks in
//!   arrival order, never skip, never feed the same instance from two
//!   tasks at once. A misordered feed does not error, it silently
//!   degrades recognition, so callers must serialize their own feeds.
//! - One engine instance per session, constructed from the shared model.
//! - Resource release happens in `Drop`. Ownership guarantees it runs
//!   exactly once on every session exit path.

use crate::audio::chunker::AudioChunk;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Word-level timing and confidence for one recognized word.
///
/// Field names are the wire format: `{"word": .., "start": .., "end": ..,
/// "conf": ..}` with times in float seconds and confidence in 0..1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordInfo {
    pub word: String,
    pub start: f64,
    pub end: f64,
    pub conf: f64,
}

/// A provisional transcription of an in-progress utterance.
///
/// Serializes to `{"partial": "<text>"}`. May be revised by a later
/// partial or superseded by a final. An empty `partial` means "nothing to
/// report yet" and must not be sent to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    pub partial: String,
}

impl PartialResult {
    pub fn empty() -> Self {
        Self {
            partial: String::new(),
        }
    }

    pub fn is_empty_text(&self) -> bool {
        self.partial.trim().is_empty()
    }
}

/// The completed transcription of one utterance segment.
///
/// Serializes to `{"text": "<text>", "result": [{word, start, end, conf},
/// ...]}`; the word list is present only when the engine tracked
/// timestamps. An empty `text` is a silence segment and must not be sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub result: Vec<WordInfo>,
}

impl FinalResult {
    pub fn is_empty_text(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// What one chunk feed produced.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    /// The engine found an utterance boundary; its internal state has
    /// reset for the next utterance.
    SegmentComplete(FinalResult),

    /// No boundary yet; the partial may carry empty text, in which case
    /// nothing is emitted.
    InProgress(PartialResult),
}

/// Per-session engine options, fixed at creation time.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Sample rate of the PCM stream the engine will be fed.
    pub sample_rate: u32,

    /// Attach word-level timestamps to final results.
    pub words: bool,

    /// Report word-level detail on partial results as well.
    pub partial_words: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            words: true,
            partial_words: true,
        }
    }
}

/// A stateful, per-session speech recognizer.
///
/// `Send` so an engine can live inside a connection actor. A single
/// instance must never see concurrent feeds; callers serialize access.
pub trait RecognitionEngine: Send {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Consume one full-size chunk and advance recognizer state.
    fn feed(&mut self, chunk: &AudioChunk) -> Result<EngineOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_wire_format() {
        let partial = PartialResult {
            partial: "hello".to_string(),
        };
        let json = serde_json::to_string(&partial).unwrap();
        assert_eq!(json, r#"{"partial":"hello"}"#);
    }

    #[test]
    fn test_final_wire_format_with_words() {
        let result = FinalResult {
            text: "hello world".to_string(),
            result: vec![WordInfo {
                word: "hello".to_string(),
                start: 0.0,
                end: 0.42,
                conf: 0.97,
            }],
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.starts_with(r#"{"text":"hello world","result":["#));
        assert!(json.contains(r#""word":"hello""#));
        assert!(json.contains(r#""conf":0.97"#));
    }

    #[test]
    fn test_final_wire_format_omits_empty_word_list() {
        let result = FinalResult {
            text: "hello".to_string(),
            result: Vec::new(),
        };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"text":"hello"}"#);
    }

    #[test]
    fn test_empty_text_detection_ignores_whitespace() {
        assert!(PartialResult {
            partial: "  ".to_string()
        }
        .is_empty_text());
        assert!(FinalResult {
            text: String::new(),
            result: Vec::new()
        }
        .is_empty_text());
        assert!(!PartialResult {
            partial: "hi".to_string()
        }
        .is_empty_text());
    }
}

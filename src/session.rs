//! # Streaming Transcription Session
//!
//! One client connection's audio pipeline, independent of the transport
//! that drives it: fragments in, ordered JSON result frames out.
//!
//! ## Per-Session Ownership:
//! Each session owns its own chunk assembler, recognizer instance, and
//! optional debug capture. Nothing here is shared between sessions, so
//! concurrent connections cannot contaminate each other's transcripts.
//! The shared model resource is only read at construction time.
//!
//! ## Fault Isolation:
//! A failure while processing a single chunk is logged and skipped; the
//! session stays active. Only transport-level events end a session, and
//! the close path (remainder discard, capture flush, engine disposal)
//! runs exactly once because `close` consumes the session and the engine
//! is released by ownership either way.

use crate::audio::capture::DebugCapture;
use crate::audio::chunker::ChunkAssembler;
use crate::config::AppConfig;
use crate::transcription::engine::{EngineOptions, EngineOutcome, RecognitionEngine};
use crate::transcription::model::SpeechModel;
use anyhow::Result;
use tracing::{debug, error, info};
use uuid::Uuid;

/// The full lifecycle of one connection's audio stream and engine state.
pub struct StreamingSession {
    id: String,
    engine: Box<dyn RecognitionEngine>,
    assembler: ChunkAssembler,
    capture: DebugCapture,
    chunks_fed: u64,
    results_emitted: u64,
}

impl StreamingSession {
    /// Construct a fresh session against the shared model.
    ///
    /// Runs at connection accept. Failure here means the connection is
    /// rejected; an accepted session always has a working engine.
    pub fn new(model: &SpeechModel, config: &AppConfig) -> Result<Self> {
        let id = Uuid::new_v4().to_string();

        let options = EngineOptions {
            sample_rate: config.audio.sample_rate,
            words: true,
            partial_words: true,
        };
        let engine = model.create_engine(options)?;
        let capture = DebugCapture::new(&id, &config.debug, &config.audio);

        info!(
            session_id = %id,
            engine = engine.name(),
            chunk_bytes = config.audio.min_chunk_bytes,
            capture = capture.is_enabled(),
            "session started"
        );

        Ok(Self {
            id,
            engine,
            assembler: ChunkAssembler::new(config.audio.min_chunk_bytes),
            capture,
            chunks_fed: 0,
            results_emitted: 0,
        })
    }

    /// Build a session around an explicit engine. Test seam; `new` is the
    /// production path.
    #[cfg(test)]
    pub fn with_engine(engine: Box<dyn RecognitionEngine>, chunk_bytes: usize) -> Self {
        let config = AppConfig::default();
        let id = Uuid::new_v4().to_string();
        Self {
            id,
            engine,
            assembler: ChunkAssembler::new(chunk_bytes),
            capture: DebugCapture::new("test", &config.debug, &config.audio),
            chunks_fed: 0,
            results_emitted: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Pump one inbound fragment through the pipeline.
    ///
    /// Appends the fragment, feeds every full chunk that became available
    /// to the engine in order, and returns the outbound JSON frames in
    /// the order the engine produced them. Empty-text partials and finals
    /// are suppressed. A chunk that makes the engine fail is logged and
    /// dropped; later chunks still flow.
    pub fn ingest(&mut self, fragment: &[u8]) -> Vec<String> {
        self.capture.record(fragment);
        self.assembler.push(fragment);

        debug!(
            session_id = %self.id,
            fragment_bytes = fragment.len(),
            total_bytes = self.assembler.total_bytes(),
            "received audio fragment"
        );

        let mut frames = Vec::new();

        while let Some(chunk) = self.assembler.next_chunk() {
            self.chunks_fed += 1;

            let outcome = match self.engine.feed(&chunk) {
                Ok(outcome) => outcome,
                Err(err) => {
                    // Per-message isolation: one bad chunk never ends the
                    // session, its effect is simply dropped.
                    error!(
                        session_id = %self.id,
                        chunk = self.chunks_fed,
                        error = %err,
                        "engine error processing chunk, skipping"
                    );
                    continue;
                }
            };

            let serialized = match outcome {
                EngineOutcome::SegmentComplete(final_result) => {
                    if final_result.is_empty_text() {
                        // Silence segment; nothing to tell the client.
                        continue;
                    }
                    serde_json::to_string(&final_result)
                }
                EngineOutcome::InProgress(partial) => {
                    if partial.is_empty_text() {
                        continue;
                    }
                    serde_json::to_string(&partial)
                }
            };

            match serialized {
                Ok(frame) => {
                    self.results_emitted += 1;
                    frames.push(frame);
                }
                Err(err) => {
                    error!(
                        session_id = %self.id,
                        error = %err,
                        "failed to serialize result, skipping"
                    );
                }
            }
        }

        frames
    }

    /// Close the session: discard the undersized remainder, flush the
    /// debug capture, and release the engine.
    ///
    /// Consuming `self` makes a second close unrepresentable; dropping a
    /// session without calling this still releases the engine, it only
    /// skips the logging and capture flush.
    pub fn close(mut self) {
        let remainder = self.assembler.take_remainder();
        if !remainder.is_empty() {
            // Deliberate: an undersized tail is never fed to the engine.
            debug!(
                session_id = %self.id,
                remainder_bytes = remainder.len(),
                "discarding undersized remainder on close"
            );
        }

        info!(
            session_id = %self.id,
            total_bytes = self.assembler.total_bytes(),
            chunks_fed = self.chunks_fed,
            results_emitted = self.results_emitted,
            "session closed"
        );

        self.capture.finish();
        // Engine instance dropped here; backend resources released.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::chunker::AudioChunk;
    use crate::transcription::engine::{FinalResult, PartialResult, WordInfo};
    use anyhow::anyhow;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Engine double that replays a script of outcomes and records every
    /// chunk it was fed, plus how many times it was dropped.
    struct ScriptedEngine {
        script: VecDeque<Result<EngineOutcome>>,
        fed: Arc<Mutex<Vec<Vec<u8>>>>,
        disposed: Arc<AtomicUsize>,
    }

    impl ScriptedEngine {
        fn boxed(
            script: Vec<Result<EngineOutcome>>,
        ) -> (Box<dyn RecognitionEngine>, Arc<Mutex<Vec<Vec<u8>>>>, Arc<AtomicUsize>) {
            let fed = Arc::new(Mutex::new(Vec::new()));
            let disposed = Arc::new(AtomicUsize::new(0));
            let engine = Box::new(ScriptedEngine {
                script: script.into_iter().collect(),
                fed: fed.clone(),
                disposed: disposed.clone(),
            });
            (engine, fed, disposed)
        }
    }

    impl RecognitionEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn feed(&mut self, chunk: &AudioChunk) -> Result<EngineOutcome> {
            self.fed.lock().unwrap().push(chunk.bytes().to_vec());
            self.script
                .pop_front()
                .unwrap_or_else(|| Ok(EngineOutcome::InProgress(PartialResult::empty())))
        }
    }

    impl Drop for ScriptedEngine {
        fn drop(&mut self) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn partial(text: &str) -> Result<EngineOutcome> {
        Ok(EngineOutcome::InProgress(PartialResult {
            partial: text.to_string(),
        }))
    }

    fn final_result(text: &str, words: Vec<WordInfo>) -> Result<EngineOutcome> {
        Ok(EngineOutcome::SegmentComplete(FinalResult {
            text: text.to_string(),
            result: words,
        }))
    }

    #[test]
    fn test_end_to_end_partial_then_final() {
        // 5000 + 3000 byte fragments at an 8000-byte chunk size yield
        // exactly one chunk, then a second chunk completes the segment.
        let words = vec![
            WordInfo {
                word: "hello".to_string(),
                start: 0.0,
                end: 0.4,
                conf: 0.98,
            },
            WordInfo {
                word: "world".to_string(),
                start: 0.45,
                end: 0.9,
                conf: 0.95,
            },
        ];
        let (engine, fed, _) = ScriptedEngine::boxed(vec![
            partial("hello"),
            final_result("hello world", words),
        ]);
        let mut session = StreamingSession::with_engine(engine, 8000);

        let frames = session.ingest(&vec![0u8; 5000]);
        assert!(frames.is_empty());
        assert!(fed.lock().unwrap().is_empty());

        let frames = session.ingest(&vec![0u8; 3000]);
        assert_eq!(frames, vec![r#"{"partial":"hello"}"#.to_string()]);
        assert_eq!(fed.lock().unwrap().len(), 1);
        assert_eq!(fed.lock().unwrap()[0].len(), 8000);

        let frames = session.ingest(&vec![0u8; 8000]);
        assert_eq!(frames.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(parsed["text"], "hello world");
        assert_eq!(parsed["result"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["result"][0]["word"], "hello");
    }

    #[test]
    fn test_empty_results_are_suppressed() {
        let (engine, _, _) = ScriptedEngine::boxed(vec![
            partial(""),
            final_result("", Vec::new()),
            partial("   "),
        ]);
        let mut session = StreamingSession::with_engine(engine, 10);

        let frames = session.ingest(&vec![0u8; 30]);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_chunks_reach_engine_in_arrival_order() {
        let (engine, fed, _) = ScriptedEngine::boxed(Vec::new());
        let mut session = StreamingSession::with_engine(engine, 4);

        session.ingest(&[1, 1, 1, 1, 2, 2]);
        session.ingest(&[2, 2, 3, 3, 3, 3]);

        let fed = fed.lock().unwrap();
        assert_eq!(fed.len(), 3);
        assert_eq!(fed[0], vec![1, 1, 1, 1]);
        assert_eq!(fed[1], vec![2, 2, 2, 2]);
        assert_eq!(fed[2], vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_engine_error_does_not_end_session() {
        let (engine, fed, _) = ScriptedEngine::boxed(vec![
            Err(anyhow!("decoder fault")),
            partial("recovered"),
        ]);
        let mut session = StreamingSession::with_engine(engine, 4);

        let frames = session.ingest(&vec![0u8; 8]);
        // First chunk's effect dropped, second chunk still processed.
        assert_eq!(frames, vec![r#"{"partial":"recovered"}"#.to_string()]);
        assert_eq!(fed.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_undersized_remainder_is_never_fed() {
        let (engine, fed, _) = ScriptedEngine::boxed(Vec::new());
        let mut session = StreamingSession::with_engine(engine, 8000);

        session.ingest(&vec![0u8; 5000]);
        session.close();

        assert!(fed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_engine_disposed_exactly_once_on_close() {
        let (engine, _, disposed) = ScriptedEngine::boxed(Vec::new());
        let session = StreamingSession::with_engine(engine, 8000);

        session.close();
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_engine_disposed_exactly_once_on_abrupt_drop() {
        // Simulated transport failure: the session is dropped mid-stream
        // without a clean close.
        let (engine, _, disposed) = ScriptedEngine::boxed(Vec::new());
        let mut session = StreamingSession::with_engine(engine, 4);
        session.ingest(&vec![0u8; 6]);

        drop(session);
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_sessions_stay_independent() {
        let (engine_a, fed_a, _) = ScriptedEngine::boxed(Vec::new());
        let (engine_b, fed_b, _) = ScriptedEngine::boxed(Vec::new());
        let mut session_a = StreamingSession::with_engine(engine_a, 4);
        let mut session_b = StreamingSession::with_engine(engine_b, 4);

        session_a.ingest(&[0xAA; 8]);
        session_b.ingest(&[0xBB; 8]);
        session_a.ingest(&[0xAA; 4]);

        let fed_a = fed_a.lock().unwrap();
        let fed_b = fed_b.lock().unwrap();
        assert_eq!(fed_a.len(), 3);
        assert_eq!(fed_b.len(), 2);
        assert!(fed_a.iter().all(|chunk| chunk.iter().all(|&b| b == 0xAA)));
        assert!(fed_b.iter().all(|chunk| chunk.iter().all(|&b| b == 0xBB)));
    }
}

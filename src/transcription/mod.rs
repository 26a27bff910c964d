//! # Transcription Module
//!
//! Speech-to-text behind a backend-neutral engine interface.
//!
//! ## Key Components:
//! - **Engine interface**: the `RecognitionEngine` trait plus the
//!   partial/final result types and their wire format
//! - **Model resource**: the shared, read-only bundle loaded once at
//!   startup that every per-session recognizer is constructed from
//! - **Backends**: a Vosk recognizer behind the `vosk` cargo feature
//!   (links against libvosk), and a null engine otherwise
//!
//! The engine contract is deliberately small: feed one fixed-size chunk,
//! get back either an in-progress partial or a completed segment. All
//! ordering and sizing guarantees live upstream in the audio module.

pub mod engine; // Engine trait, outcomes, wire-format result types
pub mod model; // Shared model resource and engine construction
pub mod null; // Backend used without the `vosk` feature

#[cfg(feature = "vosk")]
pub mod vosk; // Vosk-backed recognizer

pub use engine::{EngineOptions, EngineOutcome, FinalResult, PartialResult, RecognitionEngine};
pub use model::SpeechModel;

//! # Audio Stream Handling
//!
//! Turns the raw byte stream a websocket client sends into
//! recognizer-sized chunks, plus the optional diagnostic capture of that
//! stream.
//!
//! ## Audio Format Requirements:
//! - **Sample Rate**: 16kHz (16,000 Hz)
//! - **Bit Depth**: 16-bit PCM
//! - **Channels**: Mono (1 channel)
//! - **Encoding**: Little-endian signed integers, no header or framing

pub mod capture; // Opt-in, bounded per-session audio dump
pub mod chunker; // Fragment buffering and fixed-size chunk extraction

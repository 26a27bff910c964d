//! # Diagnostic Audio Capture
//!
//! Optional per-session copy of the raw inbound byte stream, written as a
//! WAV file when the session closes. Used to inspect exactly what a
//! client sent when chasing audio quality problems.
//!
//! The capture is opt-in (`debug.capture_audio`) and bounded
//! (`debug.capture_max_bytes`); once the cap is reached further bytes are
//! counted but not stored, so a long-lived session cannot grow memory
//! without limit.

use crate::config::{AudioConfig, DebugConfig};
use anyhow::{Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Per-session capture buffer for debug audio dumps.
pub struct DebugCapture {
    captured: Vec<u8>,
    max_bytes: usize,
    truncated_bytes: u64,
    sample_rate: u32,
    channels: u16,
    output: Option<PathBuf>,
}

impl DebugCapture {
    /// Create a capture sink for one session.
    ///
    /// Returns a disabled (zero-cost) sink unless capture is switched on
    /// in the debug configuration.
    pub fn new(session_id: &str, debug: &DebugConfig, audio: &AudioConfig) -> Self {
        let output = if debug.capture_audio {
            Some(PathBuf::from(&debug.capture_dir).join(format!("session-{}.wav", session_id)))
        } else {
            None
        };

        Self {
            captured: Vec::new(),
            max_bytes: debug.capture_max_bytes,
            truncated_bytes: 0,
            sample_rate: audio.sample_rate,
            channels: audio.channels as u16,
            output,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.output.is_some()
    }

    /// Record one inbound fragment, up to the configured byte cap.
    pub fn record(&mut self, fragment: &[u8]) {
        if self.output.is_none() {
            return;
        }

        let room = self.max_bytes.saturating_sub(self.captured.len());
        let keep = fragment.len().min(room);
        self.captured.extend_from_slice(&fragment[..keep]);
        self.truncated_bytes += (fragment.len() - keep) as u64;
    }

    /// Number of bytes currently held.
    pub fn captured_bytes(&self) -> usize {
        self.captured.len()
    }

    /// Flush the capture to disk as a 16-bit PCM WAV file.
    ///
    /// Called once from the session close path. Failures are logged
    /// rather than propagated; a broken debug dump must never affect
    /// session teardown.
    pub fn finish(self) {
        let Some(ref path) = self.output else {
            return;
        };

        if self.captured.is_empty() {
            debug!(path = %path.display(), "no audio captured, skipping debug dump");
            return;
        }

        if self.truncated_bytes > 0 {
            warn!(
                path = %path.display(),
                truncated_bytes = self.truncated_bytes,
                "debug capture hit its byte cap, dump is truncated"
            );
        }

        match self.write_wav(&path) {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes, "debug audio written");
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to write debug audio");
            }
        }
    }

    fn write_wav(&self, path: &PathBuf) -> Result<usize> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating capture directory {}", dir.display()))?;
        }

        // Drop a dangling odd byte rather than invent half a sample.
        let usable = self.captured.len() / 2 * 2;
        let mut samples = vec![0i16; usable / 2];
        LittleEndian::read_i16_into(&self.captured[..usable], &mut samples);

        let header = wav::Header::new(wav::WAV_FORMAT_PCM, self.channels, self.sample_rate, 16);
        let mut file = File::create(path)
            .with_context(|| format!("creating capture file {}", path.display()))?;
        wav::write(header, &wav::BitDepth::Sixteen(samples), &mut file)
            .with_context(|| format!("writing capture file {}", path.display()))?;

        Ok(usable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn configs(enabled: bool, max_bytes: usize) -> (DebugConfig, AudioConfig) {
        let base = AppConfig::default();
        let debug = DebugConfig {
            capture_audio: enabled,
            capture_dir: std::env::temp_dir()
                .join("speech-stream-capture-tests")
                .to_string_lossy()
                .into_owned(),
            capture_max_bytes: max_bytes,
        };
        (debug, base.audio)
    }

    #[test]
    fn test_disabled_capture_stores_nothing() {
        let (debug, audio) = configs(false, 64);
        let mut capture = DebugCapture::new("s1", &debug, &audio);
        assert!(!capture.is_enabled());
        capture.record(&[1, 2, 3, 4]);
        assert_eq!(capture.captured_bytes(), 0);
    }

    #[test]
    fn test_capture_is_bounded() {
        let (debug, audio) = configs(true, 10);
        let mut capture = DebugCapture::new("s2", &debug, &audio);
        capture.record(&[0u8; 8]);
        capture.record(&[0u8; 8]);
        assert_eq!(capture.captured_bytes(), 10);
    }

    #[test]
    fn test_finish_writes_wav_file() {
        let (debug, audio) = configs(true, 1024);
        let path = PathBuf::from(&debug.capture_dir).join("session-s3.wav");
        let _ = std::fs::remove_file(&path);

        let mut capture = DebugCapture::new("s3", &debug, &audio);
        capture.record(&[0x01, 0x00, 0xFE, 0xFF]);
        capture.finish();

        let written = std::fs::read(&path).expect("capture file exists");
        // RIFF header plus two 16-bit samples.
        assert_eq!(&written[..4], b"RIFF");
        let _ = std::fs::remove_file(&path);
    }
}

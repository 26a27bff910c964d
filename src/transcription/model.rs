//! # Speech Model Resource
//!
//! The shared, read-only model bundle every recognizer instance is built
//! from. Loaded exactly once at process startup and passed by `Arc` into
//! every session; a missing or unusable bundle is a fatal startup error,
//! checked before the server accepts a single connection.
//!
//! Provisioning the bundle (download, unpack) is external to this
//! process; the error message tells the operator where to get one.

use crate::config::ModelConfig;
use crate::transcription::engine::{EngineOptions, RecognitionEngine};
#[cfg(not(feature = "vosk"))]
use crate::transcription::null::NullEngine;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

#[cfg(feature = "vosk")]
use crate::transcription::vosk::VoskEngine;

/// The loaded model resource.
///
/// Immutable after load and safe to share: concurrent sessions only ever
/// read it while constructing their own recognizer instances.
#[derive(Debug)]
pub struct SpeechModel {
    path: PathBuf,
    #[cfg(feature = "vosk")]
    model: vosk::Model,
}

impl SpeechModel {
    /// Load the model bundle from the configured path.
    ///
    /// ## Startup Precondition:
    /// The bundle directory must already exist. Absence means the
    /// provisioning step was skipped, and the process must not start.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let path = PathBuf::from(&config.path);

        if !path.is_dir() {
            return Err(anyhow!(
                "speech model not found at '{}'; download a model from \
                 https://alphacephei.com/vosk/models and unpack it there",
                path.display()
            ));
        }

        #[cfg(feature = "vosk")]
        {
            let model = vosk::Model::new(path.to_string_lossy().as_ref()).ok_or_else(|| {
                anyhow!(
                    "failed to load speech model from '{}'; the bundle appears invalid",
                    path.display()
                )
            })?;
            tracing::info!(path = %path.display(), backend = "vosk", "speech model loaded");
            Ok(Self { path, model })
        }

        #[cfg(not(feature = "vosk"))]
        {
            tracing::warn!(
                path = %path.display(),
                "built without the 'vosk' feature; sessions will run a null engine \
                 and never produce transcripts"
            );
            Ok(Self { path })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Which recognition backend engines will use.
    pub fn backend(&self) -> &'static str {
        if cfg!(feature = "vosk") {
            "vosk"
        } else {
            "null"
        }
    }

    /// Construct a fresh, stateful recognizer bound to this model.
    ///
    /// Called once per session; each instance is independent, so there is
    /// no cross-session contention beyond this shared read-only handle.
    pub fn create_engine(&self, options: EngineOptions) -> Result<Box<dyn RecognitionEngine>> {
        #[cfg(feature = "vosk")]
        {
            return Ok(Box::new(VoskEngine::new(&self.model, options)?));
        }

        #[cfg(not(feature = "vosk"))]
        {
            Ok(Box::new(NullEngine::new(options)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_fatal_with_instruction() {
        let config = ModelConfig {
            path: "/nonexistent/model/dir".to_string(),
        };
        let err = SpeechModel::load(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/nonexistent/model/dir"));
        assert!(message.contains("alphacephei.com"));
    }

    #[cfg(not(feature = "vosk"))]
    #[test]
    fn test_existing_directory_loads_null_backend() {
        let dir = std::env::temp_dir().join("speech-stream-model-test");
        std::fs::create_dir_all(&dir).unwrap();
        let config = ModelConfig {
            path: dir.to_string_lossy().into_owned(),
        };

        let model = SpeechModel::load(&config).expect("load succeeds");
        assert_eq!(model.backend(), "null");
        assert!(model.create_engine(EngineOptions::default()).is_ok());
    }
}

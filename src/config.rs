//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub audio: AudioConfig,
    pub debug: DebugConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost
/// - `host = "0.0.0.0"`: Accept connections from any address
/// - `port = 2700`: The conventional port for a local recognition bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long to wait for in-flight sessions to drain on shutdown
    /// before they are forcibly closed.
    pub shutdown_timeout_secs: u64,
}

/// Recognition model configuration.
///
/// The model is a pretrained, read-only data bundle that must exist on
/// disk before the server starts. Provisioning it (download + unpack) is
/// external to this process; the startup error points at the canonical
/// source when the bundle is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory containing the unpacked model bundle.
    pub path: String,
}

/// Audio stream format and chunking configuration.
///
/// ## Fields:
/// - `sample_rate` / `channels` / `bit_depth`: the raw PCM format clients
///   must send (16kHz, mono, 16-bit little-endian, no header or framing)
/// - `min_chunk_bytes`: how many buffered bytes make one recognizer chunk.
///   8000 bytes of 16-bit/16kHz/mono PCM is 250ms of audio. The recognizer
///   only ever sees chunks of exactly this size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u8,
    pub bit_depth: u8,
    pub min_chunk_bytes: usize,
}

/// Diagnostic audio capture configuration.
///
/// When enabled, each session keeps a bounded copy of the raw bytes it
/// received and writes them out as a WAV file when the session closes.
/// Useful for inspecting what clients actually sent; off by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    pub capture_audio: bool,
    /// Directory where per-session capture files are written.
    pub capture_dir: String,
    /// Hard cap on captured bytes per session.
    pub capture_max_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 2700,
                shutdown_timeout_secs: 10,
            },
            model: ModelConfig {
                path: "model/en".to_string(),
            },
            audio: AudioConfig {
                sample_rate: 16000,
                channels: 1,
                bit_depth: 16,
                min_chunk_bytes: 8000, // 250ms of 16-bit/16kHz/mono PCM
            },
            debug: DebugConfig {
                capture_audio: false,
                capture_dir: "debug_audio".to_string(),
                capture_max_bytes: 16 * 1024 * 1024,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, then config.toml (if present),
    /// then environment variables.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER_HOST=0.0.0.0`: Override server host
    /// - `APP_SERVER_PORT=3000`: Override server port
    /// - `APP_MODEL_PATH=/opt/models/en`: Override model location
    /// - `HOST` / `PORT`: Special cases for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms commonly inject these without the APP_ prefix.
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// Catching these at startup gives a clear message instead of a
    /// confusing failure once audio starts flowing.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.model.path.trim().is_empty() {
            return Err(anyhow::anyhow!("Model path cannot be empty"));
        }

        if self.audio.sample_rate == 0 {
            return Err(anyhow::anyhow!("Sample rate must be greater than 0"));
        }

        if self.audio.channels != 1 {
            return Err(anyhow::anyhow!(
                "Only mono audio is supported (got {} channels)",
                self.audio.channels
            ));
        }

        if self.audio.bit_depth != 16 {
            return Err(anyhow::anyhow!(
                "Only 16-bit PCM is supported (got {}-bit)",
                self.audio.bit_depth
            ));
        }

        if self.audio.min_chunk_bytes == 0 {
            return Err(anyhow::anyhow!("Minimum chunk size must be greater than 0"));
        }

        // Chunks are decoded as whole 16-bit samples, so the size must be even.
        if self.audio.min_chunk_bytes % 2 != 0 {
            return Err(anyhow::anyhow!(
                "Minimum chunk size must be even for 16-bit samples (got {})",
                self.audio.min_chunk_bytes
            ));
        }

        if self.debug.capture_audio && self.debug.capture_max_bytes == 0 {
            return Err(anyhow::anyhow!(
                "Capture byte limit must be greater than 0 when capture is enabled"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 2700);
        assert_eq!(config.audio.min_chunk_bytes, 8000);
        assert!(!config.debug.capture_audio);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_odd_chunk_size() {
        let mut config = AppConfig::default();
        config.audio.min_chunk_bytes = 8001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_stereo() {
        let mut config = AppConfig::default();
        config.audio.channels = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_zero_capture_limit() {
        let mut config = AppConfig::default();
        config.debug.capture_audio = true;
        config.debug.capture_max_bytes = 0;
        assert!(config.validate().is_err());
    }
}

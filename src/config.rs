//! Configuration for the voice interaction core

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Capture session tuning
    pub capture: CaptureConfig,
    /// Playback orchestration tuning
    pub playback: PlaybackConfig,
}

/// Capture session configuration
///
/// One struct replaces the zoo of per-screen capture variants: a session is
/// parameterized, not forked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Keep listening after a final chunk instead of finalizing immediately
    pub continuous: bool,
    /// Ask the capability for interim (non-final) chunks
    pub interim_results: bool,
    /// Silence timer, re-armed on every chunk (ms)
    pub silence_ms: u64,
    /// Hard ceiling on the whole attempt, never re-armed (ms)
    pub hard_ceiling_ms: u64,
    /// Collapse character runs >= 2 to 1 instead of >= 3 to 2
    pub aggressive_collapse: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::single_utterance()
    }
}

impl CaptureConfig {
    /// Preset for one short spoken answer: finalize fast, short silence
    /// window
    #[must_use]
    pub const fn single_utterance() -> Self {
        Self {
            continuous: false,
            interim_results: true,
            silence_ms: 1500,
            hard_ceiling_ms: 8000,
            aggressive_collapse: false,
        }
    }

    /// Preset for free-form dictation: longer silence tolerance
    #[must_use]
    pub const fn continuous() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            silence_ms: 5000,
            hard_ceiling_ms: 8000,
            aggressive_collapse: false,
        }
    }
}

/// Playback orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Upper bound on sanitized text length (chars); bounds synthesis
    /// latency and cost
    pub max_text_chars: usize,
    /// Voice used when a language tag has no mapping
    pub default_voice: String,
    /// Remote TTS endpoint
    pub remote_url: String,
    /// Remote TTS model identifier
    pub remote_model: String,
    /// API key for the remote synthesizer; `None` means unauthenticated and
    /// the orchestrator goes straight to local synthesis
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_text_chars: 480,
            default_voice: "alloy".to_string(),
            remote_url: "https://api.openai.com/v1/audio/speech".to_string(),
            remote_model: "tts-1".to_string(),
            api_key: None,
        }
    }
}

/// Number of consecutive capture failures before suggesting typed input
pub const FALLBACK_THRESHOLD: u32 = 2;

/// Environment variable holding the remote synthesis API key
pub const TTS_API_KEY_ENV: &str = "VOICELOOP_TTS_API_KEY";

/// Return the default config file path (`~/.config/voiceloop/config.toml`
/// on Linux)
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "voiceloop", "voiceloop").map_or_else(
        || PathBuf::from("voiceloop.toml"),
        |d| d.config_dir().join("config.toml"),
    )
}

impl CoreConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file is absent. The remote API key is always taken from the
    /// environment, never from disk.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        config.playback.api_key = std::env::var(TTS_API_KEY_ENV).ok();
        config.validate()?;
        Ok(config)
    }

    /// Validate tuning values
    ///
    /// # Errors
    ///
    /// Returns error if a timer or bound is out of range
    pub fn validate(&self) -> Result<()> {
        if self.capture.silence_ms == 0 {
            return Err(Error::Config("capture.silence_ms must be > 0".to_string()));
        }
        if self.capture.hard_ceiling_ms < self.capture.silence_ms && !self.capture.continuous {
            return Err(Error::Config(
                "capture.hard_ceiling_ms must be >= capture.silence_ms".to_string(),
            ));
        }
        if self.playback.max_text_chars == 0 {
            return Err(Error::Config(
                "playback.max_text_chars must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

//! Error types for the voice interaction core

use thiserror::Error;

/// Result type alias for voiceloop operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice interaction core
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A capture session is already running
    #[error("a capture session is already active")]
    CaptureBusy,

    /// Capture session failed
    #[error("capture error: {0}")]
    Capture(CaptureError),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Remote synthesis error (recovered via local fallback, surfaced only
    /// when diagnostics need the underlying cause)
    #[error("remote synthesis error: {0}")]
    RemoteSynthesis(String),

    /// No local synthesis voice is available on this host
    #[error("local synthesis unsupported: {0}")]
    LocalSynthesisUnsupported(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// How a capture session ended when it did not produce text
///
/// `PermissionDenied` and `DeviceUnavailable` are terminal for the whole
/// voice feature; the rest are retryable and handled by the fallback policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// No usable final result before the silence or hard-ceiling timer fired
    #[error("capture timed out")]
    Timeout,

    /// The capability reported that no speech was heard
    #[error("no speech detected")]
    NoSpeechDetected,

    /// Microphone permission was denied
    #[error("microphone permission denied")]
    PermissionDenied,

    /// No capture device is available
    #[error("capture device unavailable")]
    DeviceUnavailable,

    /// Any other capability fault
    #[error("capture failed: {0}")]
    Other(String),
}

impl CaptureError {
    /// Whether this error means the voice feature cannot work at all
    /// (no retry is useful)
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::DeviceUnavailable)
    }
}

impl From<CaptureError> for Error {
    fn from(e: CaptureError) -> Self {
        Self::Capture(e)
    }
}

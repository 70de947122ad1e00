//! Speech capture: provider abstraction and session state machine
//!
//! The core does not talk to a microphone or a recognition engine itself;
//! it drives a [`CaptureProvider`] and wraps the control logic (timers,
//! normalization, retry policy, confirmation) around it.

mod confirm;
mod policy;
mod session;

pub use confirm::ConfirmationGate;
pub use policy::{FallbackPolicy, PolicyUpdate, ResultKind};
pub use session::{CaptureSession, SessionOutcome, SessionState, StopHandle};

use async_trait::async_trait;

use crate::Result;

/// One piece of recognized text from the capability
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptChunk {
    /// Recognized text
    pub text: String,
    /// The capability asserts this text will not change further
    pub is_final: bool,
    /// Recognition confidence, when the capability reports one
    pub confidence: Option<f32>,
}

impl TranscriptChunk {
    /// Interim chunk helper
    #[must_use]
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            confidence: None,
        }
    }

    /// Final chunk helper
    #[must_use]
    pub fn final_(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence: None,
        }
    }
}

/// Fault kinds a capture capability can report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureFault {
    /// Nothing was heard
    NoSpeech,
    /// The audio device failed or is missing
    AudioCapture,
    /// Microphone permission denied
    NotAllowed,
    /// The capability was aborted from outside the session
    Aborted,
    /// Anything else
    Other(String),
}

/// Events emitted by a capture capability
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// The capability acknowledged `start()` and is listening
    Started,
    /// A piece of recognized text
    Chunk(TranscriptChunk),
    /// The capability decided the utterance is over
    SpeechEnded,
    /// The capability faulted
    Fault(CaptureFault),
}

/// A speech capture capability (e.g. a recognition engine adapter)
///
/// One provider instance backs exactly one capture session; the session
/// consumes it and drops it on any terminal transition.
#[async_trait]
pub trait CaptureProvider: Send {
    /// Begin recognition; a [`CaptureEvent::Started`] acknowledgement is
    /// expected on the event stream
    ///
    /// # Errors
    ///
    /// Returns error if recognition cannot start
    async fn start(&mut self) -> Result<()>;

    /// Stop recognition gracefully, flushing any pending final chunk
    ///
    /// # Errors
    ///
    /// Returns error if the capability rejects the stop
    async fn stop(&mut self) -> Result<()>;

    /// Tear recognition down without waiting for pending results
    ///
    /// # Errors
    ///
    /// Returns error if the capability rejects the abort
    async fn abort(&mut self) -> Result<()>;

    /// Next event from the capability; `None` once the underlying stream
    /// is closed
    async fn next_event(&mut self) -> Option<CaptureEvent>;
}

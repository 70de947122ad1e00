//! voiceloop - voice interaction core
//!
//! This library provides the control logic around unreliable speech
//! capabilities:
//! - Capture: a session state machine with silence/ceiling timers, a
//!   transcript normalizer, a consecutive-failure fallback policy, and an
//!   optional confirmation gate
//! - Playback: a single-flight orchestrator that sanitizes text, tries a
//!   remote synthesizer, and falls back to an on-device voice
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Caller (UI)                      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    VoiceCore                         │
//! │  Session ─ Normalizer ─ Policy ─ Gate │ Orchestrator │
//! └──────┬───────────────────────────────────┬──────────┘
//!        │                                   │
//! ┌──────▼──────────┐            ┌───────────▼──────────┐
//! │ CaptureProvider │            │ Remote/Local synth + │
//! │ (recognition)   │            │ AudioSink            │
//! └─────────────────┘            └──────────────────────┘
//! ```
//!
//! The capabilities themselves (recognition engines, synthesis engines,
//! audio devices) live behind the provider traits; the core never talks to
//! hardware or the network except through them.

pub mod capture;
pub mod config;
pub mod error;
pub mod matching;
pub mod normalize;
pub mod pipeline;
pub mod playback;
pub mod providers;
pub mod supervisor;

pub use capture::{
    CaptureEvent, CaptureFault, CaptureProvider, CaptureSession, ConfirmationGate, FallbackPolicy,
    PolicyUpdate, ResultKind, SessionOutcome, SessionState, StopHandle, TranscriptChunk,
};
pub use config::{CaptureConfig, CoreConfig, FALLBACK_THRESHOLD, PlaybackConfig};
pub use error::{CaptureError, Error, Result};
pub use matching::answer_matches;
pub use normalize::normalize;
pub use pipeline::{CaptureReport, VoiceCore};
pub use playback::{
    AudioSink, CancelToken, Canceller, LocalSynthesizer, LocalVoice, PlaybackHandle,
    PlaybackOrchestrator, PlaybackOutcome, PlaybackSource, RemoteSynthesizer, SynthesisError,
    VoiceQuality, cancel_pair, sanitize,
};
pub use supervisor::Supervisor;

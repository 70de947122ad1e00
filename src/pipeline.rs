//! Voice interaction core facade
//!
//! Wires one capture session at a time through the fallback policy and the
//! optional confirmation gate, and owns the playback orchestrator. This is
//! the surface a UI talks to.

use std::sync::{Arc, Weak};

use crate::capture::{
    CaptureProvider, CaptureSession, ConfirmationGate, FallbackPolicy, PolicyUpdate, ResultKind,
    SessionOutcome, StopHandle,
};
use crate::config::CoreConfig;
use crate::error::CaptureError;
use crate::playback::{PlaybackHandle, PlaybackOrchestrator};
use crate::{Error, Result};

/// What a finished capture attempt means for the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureReport {
    /// Text accepted downstream
    Accepted(String),
    /// Text is waiting in the confirmation gate
    AwaitingConfirmation(String),
    /// Attempt failed; `suggest_typing` is set the one time the fallback
    /// advisory should be shown
    Failed {
        /// Why the attempt failed
        error: CaptureError,
        /// Surface the "try typing instead" advisory now
        suggest_typing: bool,
    },
}

/// The voice interaction core
///
/// Capture single-flight is enforced here: starting a capture while one is
/// running is a caller error ([`Error::CaptureBusy`]), not a silent no-op.
/// The busy marker is a lease held by the session itself, so a session that
/// is dropped on any path (cancelled future included) frees the slot.
pub struct VoiceCore {
    config: CoreConfig,
    policy: FallbackPolicy,
    gate: ConfirmationGate,
    confirmation_enabled: bool,
    playback: PlaybackOrchestrator,
    capture_lease: Weak<()>,
}

impl VoiceCore {
    /// Create a core around a playback orchestrator
    #[must_use]
    pub fn new(config: CoreConfig, playback: PlaybackOrchestrator, confirm: bool) -> Self {
        Self {
            config,
            policy: FallbackPolicy::new(),
            gate: ConfirmationGate::new(),
            confirmation_enabled: confirm,
            playback,
            capture_lease: Weak::new(),
        }
    }

    /// Run one capture attempt to completion and route the result through
    /// the policy and (when enabled) the confirmation gate. Callers that
    /// need a manual stop use [`Self::start_capture`] /
    /// [`Self::finish_capture`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureBusy`] if a session is already running
    pub async fn capture<P: CaptureProvider>(&mut self, provider: P) -> Result<CaptureReport> {
        let (session, _stop) = self.start_capture(provider)?;
        let outcome = session.run().await;
        Ok(self.route_outcome(outcome))
    }

    /// Begin a capture attempt, returning the session (for the caller to
    /// drive) and a stop handle. The caller must pass the outcome back via
    /// [`Self::finish_capture`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureBusy`] if a session is already running
    pub fn start_capture<P: CaptureProvider>(
        &mut self,
        provider: P,
    ) -> Result<(CaptureSession<P>, StopHandle)> {
        if self.capture_lease.upgrade().is_some() {
            return Err(Error::CaptureBusy);
        }
        let lease = Arc::new(());
        self.capture_lease = Arc::downgrade(&lease);
        Ok(CaptureSession::with_lease(
            provider,
            self.config.capture.clone(),
            lease,
        ))
    }

    /// Report the outcome of a session obtained from [`Self::start_capture`].
    /// The busy slot is tied to the session's lifetime, not to this call.
    pub fn finish_capture(&mut self, outcome: SessionOutcome) -> CaptureReport {
        self.route_outcome(outcome)
    }

    /// Accept the pending confirmation, forwarding the text exactly once
    pub fn accept(&mut self) -> Option<String> {
        self.gate.accept()
    }

    /// Discard the pending confirmation; the caller should start a new
    /// capture attempt
    pub fn discard(&mut self) {
        self.gate.discard();
    }

    /// User-initiated "try voice again": clears the failure streak and the
    /// manual-text fallback flag
    pub fn retry(&mut self) {
        self.policy.retry();
    }

    /// Whether the UI should offer typed input instead of voice
    #[must_use]
    pub const fn fallback_active(&self) -> bool {
        self.policy.fallback_active()
    }

    /// Speak text, superseding any in-flight playback
    pub fn speak(&mut self, text: &str, language_tag: &str) -> PlaybackHandle {
        self.playback.speak(text, language_tag)
    }

    /// Stop any in-flight playback; no-op when idle
    pub fn stop_speaking(&mut self) {
        self.playback.stop();
    }

    fn route_outcome(&mut self, outcome: SessionOutcome) -> CaptureReport {
        match outcome {
            SessionOutcome::Completed(text) => {
                self.policy.on_result(ResultKind::Success);
                if self.confirmation_enabled {
                    self.gate.present(text.clone());
                    CaptureReport::AwaitingConfirmation(text)
                } else {
                    CaptureReport::Accepted(text)
                }
            }
            SessionOutcome::Failed(error) => {
                let update = self.policy.on_result(ResultKind::from(&error));
                CaptureReport::Failed {
                    error,
                    suggest_typing: update == PolicyUpdate::SuggestTyping,
                }
            }
        }
    }
}

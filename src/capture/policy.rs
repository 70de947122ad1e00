//! Failure/fallback policy
//!
//! The only state that outlives a capture session. Counts consecutive
//! failures and flips the "offer typed input instead" flag once voice has
//! failed often enough to be annoying.

use crate::config::FALLBACK_THRESHOLD;
use crate::error::CaptureError;

/// Classification of a finished capture attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// Attempt produced text
    Success,
    /// Timer won before a usable result
    Timeout,
    /// Capability heard nothing
    NoSpeech,
    /// Any other retryable fault
    OtherError,
    /// Permission denied or device missing; voice cannot work at all
    Terminal,
}

impl From<&CaptureError> for ResultKind {
    fn from(e: &CaptureError) -> Self {
        match e {
            CaptureError::Timeout => Self::Timeout,
            CaptureError::NoSpeechDetected => Self::NoSpeech,
            CaptureError::PermissionDenied | CaptureError::DeviceUnavailable => Self::Terminal,
            CaptureError::Other(_) => Self::OtherError,
        }
    }
}

/// What the caller should surface after reporting a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyUpdate {
    /// Nothing changed
    None,
    /// Fallback just activated; show the "try typing instead" advisory.
    /// Returned at most once until [`FallbackPolicy::retry`].
    SuggestTyping,
}

/// Tracks consecutive capture failures across sessions
#[derive(Debug, Default)]
pub struct FallbackPolicy {
    consecutive_failures: u32,
    fallback_active: bool,
    advisory_shown: bool,
}

impl FallbackPolicy {
    /// Create a fresh policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a finished attempt and learn what to surface
    pub fn on_result(&mut self, kind: ResultKind) -> PolicyUpdate {
        match kind {
            ResultKind::Success => {
                self.consecutive_failures = 0;
                PolicyUpdate::None
            }
            ResultKind::Terminal => {
                // No amount of retrying fixes a denied mic.
                self.consecutive_failures += 1;
                self.activate()
            }
            ResultKind::Timeout | ResultKind::NoSpeech | ResultKind::OtherError => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= FALLBACK_THRESHOLD {
                    self.activate()
                } else {
                    PolicyUpdate::None
                }
            }
        }
    }

    /// User explicitly chose "try voice again"
    pub fn retry(&mut self) {
        self.consecutive_failures = 0;
        self.fallback_active = false;
        self.advisory_shown = false;
        tracing::debug!("fallback policy reset by user retry");
    }

    /// Whether the manual-text affordance should be offered
    #[must_use]
    pub const fn fallback_active(&self) -> bool {
        self.fallback_active
    }

    /// Current consecutive failure count
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    fn activate(&mut self) -> PolicyUpdate {
        self.fallback_active = true;
        if self.advisory_shown {
            PolicyUpdate::None
        } else {
            self.advisory_shown = true;
            tracing::info!(
                failures = self.consecutive_failures,
                "suggesting typed input"
            );
            PolicyUpdate::SuggestTyping
        }
    }
}

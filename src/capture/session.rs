//! Capture session state machine
//!
//! Owns one recognition attempt end to end: drives the provider, feeds
//! every chunk through the normalizer, and lets the silence/ceiling
//! supervisors bound the attempt. A session is consumed by [`CaptureSession::run`]
//! and never reused; the next attempt gets a fresh instance.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::capture::{CaptureEvent, CaptureFault, CaptureProvider, TranscriptChunk};
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::normalize::normalize;
use crate::supervisor::Supervisor;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No attempt in progress
    Idle,
    /// `start()` issued, waiting for the capability's acknowledgement
    Starting,
    /// Receiving chunks
    Listening,
    /// A usable final result arrived; wrapping up
    Finalizing,
    /// Terminal: produced text
    Completed,
    /// Terminal: a timer won
    TimedOut,
    /// Terminal: the capability faulted
    Failed,
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Normalized transcript
    Completed(String),
    /// Error kind for the fallback policy
    Failed(CaptureError),
}

/// Handle for requesting a manual stop of a running session
///
/// Cheap to clone; stopping an already-terminal session is a no-op.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: mpsc::Sender<()>,
}

impl StopHandle {
    /// Request the session finalize with whatever text it has accumulated
    pub fn stop(&self) {
        let _ = self.tx.try_send(());
    }
}

/// What the select loop decided to do next
enum Step {
    Event(Option<CaptureEvent>),
    SilenceTimeout,
    CeilingTimeout,
    StopRequested,
}

/// One capture attempt
pub struct CaptureSession<P: CaptureProvider> {
    provider: P,
    config: CaptureConfig,
    state: SessionState,
    /// Final chunk texts, in arrival order
    finals: Vec<String>,
    /// Latest interim chunk; each interim supersedes the previous one
    /// (recognition engines emit cumulative interim text)
    interim: String,
    /// Always recomputed from `finals` + `interim`, never appended to.
    /// Appending is how the duplicate-accumulation bugs happened.
    normalized: String,
    started_at: Instant,
    last_activity: Instant,
    completed: bool,
    silence: Supervisor,
    ceiling: Supervisor,
    stop_rx: mpsc::Receiver<()>,
    /// Keeps the stop channel open even when every [`StopHandle`] is
    /// dropped; a closed channel must not look like a stop request
    _stop_keepalive: mpsc::Sender<()>,
    /// Busy marker held for the session's whole lifetime; released when
    /// the session is dropped, however it ends
    _lease: Option<Arc<()>>,
}

impl<P: CaptureProvider> CaptureSession<P> {
    /// Create a session around a fresh provider instance
    pub fn new(provider: P, config: CaptureConfig) -> (Self, StopHandle) {
        Self::build(provider, config, None)
    }

    /// Like [`Self::new`], but the session carries a busy marker that its
    /// owner watches through a [`Weak`](std::sync::Weak)
    pub(crate) fn with_lease(
        provider: P,
        config: CaptureConfig,
        lease: Arc<()>,
    ) -> (Self, StopHandle) {
        Self::build(provider, config, Some(lease))
    }

    fn build(provider: P, config: CaptureConfig, lease: Option<Arc<()>>) -> (Self, StopHandle) {
        let (tx, stop_rx) = mpsc::channel(1);
        let now = Instant::now();
        let session = Self {
            provider,
            config,
            state: SessionState::Idle,
            finals: Vec::new(),
            interim: String::new(),
            normalized: String::new(),
            started_at: now,
            last_activity: now,
            completed: false,
            silence: Supervisor::new(),
            ceiling: Supervisor::new(),
            stop_rx,
            _stop_keepalive: tx.clone(),
            _lease: lease,
        };
        (session, StopHandle { tx })
    }

    /// Current state (useful between construction and `run`)
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the attempt to a terminal outcome
    pub async fn run(mut self) -> SessionOutcome {
        self.state = SessionState::Starting;
        self.started_at = Instant::now();

        if let Err(e) = self.provider.start().await {
            tracing::warn!(error = %e, "capture provider failed to start");
            return self.fail(CaptureError::Other(e.to_string())).await;
        }

        // The ceiling also covers a capability that never acknowledges
        // start; it is re-armed on the acknowledgement.
        self.ceiling
            .arm(Duration::from_millis(self.config.hard_ceiling_ms));

        loop {
            let step = {
                let Self {
                    provider,
                    silence,
                    ceiling,
                    stop_rx,
                    ..
                } = &mut self;

                tokio::select! {
                    _ = stop_rx.recv() => Step::StopRequested,
                    event = provider.next_event() => Step::Event(event),
                    () = silence.expired() => Step::SilenceTimeout,
                    () = ceiling.expired() => Step::CeilingTimeout,
                }
            };

            match step {
                Step::Event(Some(CaptureEvent::Started)) => {
                    if self.state == SessionState::Starting {
                        self.state = SessionState::Listening;
                        self.silence
                            .arm(Duration::from_millis(self.config.silence_ms));
                        self.ceiling
                            .arm(Duration::from_millis(self.config.hard_ceiling_ms));
                        tracing::debug!(
                            silence_ms = self.config.silence_ms,
                            ceiling_ms = self.config.hard_ceiling_ms,
                            "capture listening"
                        );
                    }
                }
                Step::Event(Some(CaptureEvent::Chunk(chunk))) => {
                    if let Some(outcome) = self.on_chunk(chunk).await {
                        return outcome;
                    }
                }
                Step::Event(Some(CaptureEvent::SpeechEnded)) => {
                    tracing::debug!(text = %self.normalized, "capability reported end of speech");
                    return self.finalize_with_accumulated().await;
                }
                Step::Event(Some(CaptureEvent::Fault(fault))) => {
                    return self.fail(map_fault(fault)).await;
                }
                Step::Event(None) => {
                    // Stream closed without a terminal signal. Salvage text
                    // if we have a usable result, otherwise report a fault.
                    if self.has_final_text() {
                        return self.complete().await;
                    }
                    return self
                        .fail(CaptureError::Other("capture stream ended unexpectedly".into()))
                        .await;
                }
                Step::StopRequested => {
                    tracing::debug!(text = %self.normalized, "manual stop requested");
                    let _ = self.provider.stop().await;
                    return self.finalize_with_accumulated().await;
                }
                Step::SilenceTimeout => {
                    return self.on_timer("silence").await;
                }
                Step::CeilingTimeout => {
                    return self.on_timer("hard ceiling").await;
                }
            }
        }
    }

    /// Merge one chunk; returns a terminal outcome when a final chunk ends
    /// a non-continuous session
    async fn on_chunk(&mut self, chunk: TranscriptChunk) -> Option<SessionOutcome> {
        // A chunk before the start acknowledgement still counts as speech.
        if self.state == SessionState::Starting {
            self.state = SessionState::Listening;
            self.ceiling
                .arm(Duration::from_millis(self.config.hard_ceiling_ms));
        }
        if self.state != SessionState::Listening {
            return None;
        }

        // Any chunk is activity, even an interim one we discard below.
        self.last_activity = Instant::now();
        self.silence
            .arm(Duration::from_millis(self.config.silence_ms));

        let is_final = chunk.is_final;
        if is_final {
            self.finals.push(chunk.text);
            self.interim.clear();
        } else if self.config.interim_results {
            self.interim = chunk.text;
        } else {
            return None;
        }

        self.recompute_normalized();

        tracing::trace!(is_final, text = %self.normalized, "chunk merged");

        if is_final && !self.config.continuous && !self.normalized.is_empty() {
            self.state = SessionState::Finalizing;
            return Some(self.complete().await);
        }
        None
    }

    /// Timer expiry: a usable final result beats the timer, otherwise the
    /// attempt timed out. Both supervisors are disarmed by the terminal
    /// transition, so the other timer can never produce a second report.
    async fn on_timer(&mut self, which: &str) -> SessionOutcome {
        let idle_ms = self.last_activity.elapsed().as_millis();
        tracing::debug!(timer = which, idle_ms, "capture timer fired");
        if self.has_final_text() {
            self.state = SessionState::Finalizing;
            return self.complete().await;
        }
        self.fail(CaptureError::Timeout).await
    }

    /// Manual stop / end-of-speech: accumulated text is a normal
    /// completion, no text is a timeout
    async fn finalize_with_accumulated(&mut self) -> SessionOutcome {
        self.state = SessionState::Finalizing;
        if self.normalized.is_empty() {
            return self.fail(CaptureError::Timeout).await;
        }
        self.complete().await
    }

    async fn complete(&mut self) -> SessionOutcome {
        // Guard against double completion when the capability emits more
        // than one terminal signal for the same utterance.
        if self.completed {
            return SessionOutcome::Completed(self.normalized.clone());
        }
        self.completed = true;
        self.teardown().await;
        self.state = SessionState::Completed;
        tracing::info!(
            text = %self.normalized,
            elapsed_ms = self.started_at.elapsed().as_millis(),
            "capture completed"
        );
        SessionOutcome::Completed(self.normalized.clone())
    }

    async fn fail(&mut self, error: CaptureError) -> SessionOutcome {
        self.teardown().await;
        self.state = if error == CaptureError::Timeout {
            SessionState::TimedOut
        } else {
            SessionState::Failed
        };
        tracing::warn!(
            error = %error,
            elapsed_ms = self.started_at.elapsed().as_millis(),
            "capture failed"
        );
        SessionOutcome::Failed(error)
    }

    /// Disarm timers and release the capability
    async fn teardown(&mut self) {
        self.silence.disarm();
        self.ceiling.disarm();
        if let Err(e) = self.provider.abort().await {
            tracing::debug!(error = %e, "provider abort failed");
        }
    }

    fn recompute_normalized(&mut self) {
        let mut raw = self.finals.join(" ");
        if !self.interim.is_empty() {
            if !raw.is_empty() {
                raw.push(' ');
            }
            raw.push_str(&self.interim);
        }
        self.normalized = normalize(&raw, self.config.aggressive_collapse);
    }

    fn has_final_text(&self) -> bool {
        !self.finals.is_empty() && !self.normalized.is_empty()
    }
}

/// Map a capability fault to the capture error taxonomy
fn map_fault(fault: CaptureFault) -> CaptureError {
    match fault {
        CaptureFault::NoSpeech => CaptureError::NoSpeechDetected,
        CaptureFault::NotAllowed => CaptureError::PermissionDenied,
        CaptureFault::AudioCapture => CaptureError::DeviceUnavailable,
        CaptureFault::Aborted => CaptureError::Other("capture aborted".to_string()),
        CaptureFault::Other(reason) => CaptureError::Other(reason),
    }
}

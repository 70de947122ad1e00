//! Playback orchestration
//!
//! Owns one speech-output request at a time: sanitize the text, try the
//! remote synthesizer, fall back to the local one on any failure, and
//! guarantee that starting a new request silences the previous one first.

mod sanitize;
mod voices;

pub use sanitize::sanitize;
pub use voices::{LocalVoice, VoiceQuality, primary_subtag, rate_for_language, remote_voice_for, select_voice};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::Result;
use crate::config::PlaybackConfig;

/// How long to wait for an asynchronously loading voice list before
/// settling for whatever is available
const VOICE_LIST_GRACE: Duration = Duration::from_millis(250);

/// Why a remote synthesis attempt failed
///
/// Every variant triggers local fallback; `Unavailable` is the provider's
/// explicit "stop asking, fall back now" signal.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Transient failure (network, 5xx); a later request may succeed
    #[error("remote synthesis failed: {0}")]
    Retryable(String),
    /// The provider told us to fall back (quota, unsupported voice)
    #[error("remote synthesis unavailable: {0}")]
    Unavailable(String),
}

/// Cancellation signal for an in-flight playback
///
/// The sender half lives in the orchestrator; providers watch their clone
/// of the token and must go silent as soon as it flips.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested
    pub async fn cancelled(&mut self) {
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                // Canceller dropped without firing; treat as cancelled so
                // orphaned tasks wind down.
                return;
            }
        }
    }
}

/// Sender half of a cancellation pair
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    /// Signal cancellation; observable synchronously via
    /// [`CancelToken::is_cancelled`]
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a linked canceller/token pair
#[must_use]
pub fn cancel_pair() -> (Canceller, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx }, CancelToken { rx })
}

/// Network-backed synthesizer: text + voice id in, audio bytes out
#[async_trait]
pub trait RemoteSynthesizer: Send + Sync {
    /// Synthesize `text` with the given voice
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError`] on any failure; the orchestrator falls
    /// back to local synthesis either way
    async fn synthesize(&self, text: &str, voice_id: &str)
    -> std::result::Result<Vec<u8>, SynthesisError>;
}

/// Plays synthesized audio bytes; must honor the cancel token promptly
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play the audio to completion or cancellation
    ///
    /// # Errors
    ///
    /// Returns error if the audio cannot be decoded or the device fails
    async fn play(&self, audio: &[u8], cancel: CancelToken) -> Result<()>;
}

/// On-device synthesizer with its own voice inventory
#[async_trait]
pub trait LocalSynthesizer: Send + Sync {
    /// Currently installed voices; may be empty while the platform is
    /// still enumerating them
    fn voices(&self) -> Vec<LocalVoice>;

    /// Notified whenever the voice inventory changes
    fn voices_changed(&self) -> watch::Receiver<()>;

    /// Speak the text with the given voice and rate
    ///
    /// # Errors
    ///
    /// Returns error if the engine rejects the request
    async fn speak(
        &self,
        text: &str,
        voice: &LocalVoice,
        rate: f32,
        cancel: CancelToken,
    ) -> Result<()>;
}

/// Which synthesis source produced the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackSource {
    /// Remote synthesizer + audio sink
    Remote,
    /// On-device synthesizer
    Local,
}

/// Terminal status of one playback request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Audio played to the end
    Completed(PlaybackSource),
    /// Sanitized text was empty; nothing to do
    Skipped,
    /// Superseded by a newer request or an explicit `stop()`
    Cancelled,
    /// Both sources failed; the failure is logged, not surfaced
    Failed,
}

/// Awaitable outcome of a `speak` call
pub struct PlaybackHandle {
    inner: HandleInner,
}

enum HandleInner {
    Ready(PlaybackOutcome),
    Task(JoinHandle<PlaybackOutcome>),
}

impl PlaybackHandle {
    /// Wait for the request to reach a terminal status
    pub async fn outcome(self) -> PlaybackOutcome {
        match self.inner {
            HandleInner::Ready(outcome) => outcome,
            HandleInner::Task(handle) => handle.await.unwrap_or(PlaybackOutcome::Cancelled),
        }
    }
}

/// Single-flight speech output
pub struct PlaybackOrchestrator {
    remote: Option<Arc<dyn RemoteSynthesizer>>,
    sink: Arc<dyn AudioSink>,
    local: Arc<dyn LocalSynthesizer>,
    config: PlaybackConfig,
    active: Option<Canceller>,
}

impl PlaybackOrchestrator {
    /// Create an orchestrator. `remote` is `None` when the caller is not
    /// authenticated with the remote provider; requests then go straight
    /// to local synthesis by policy, not as a failure path.
    #[must_use]
    pub fn new(
        remote: Option<Arc<dyn RemoteSynthesizer>>,
        sink: Arc<dyn AudioSink>,
        local: Arc<dyn LocalSynthesizer>,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            remote,
            sink,
            local,
            config,
            active: None,
        }
    }

    /// Speak `text` in the given language, cancelling any request still
    /// in flight (last caller wins)
    pub fn speak(&mut self, text: &str, language_tag: &str) -> PlaybackHandle {
        // Prior audio must be silent before the new request starts.
        self.stop();

        let sanitized = sanitize(text, self.config.max_text_chars);
        if sanitized.is_empty() {
            tracing::debug!("nothing to speak after sanitation");
            return PlaybackHandle {
                inner: HandleInner::Ready(PlaybackOutcome::Skipped),
            };
        }

        let (canceller, token) = cancel_pair();
        self.active = Some(canceller);

        let remote = self.remote.clone();
        let sink = Arc::clone(&self.sink);
        let local = Arc::clone(&self.local);
        let default_voice = self.config.default_voice.clone();
        let language = language_tag.to_string();

        let task = tokio::spawn(async move {
            run_request(remote, sink, local, &default_voice, &sanitized, &language, token).await
        });

        PlaybackHandle {
            inner: HandleInner::Task(task),
        }
    }

    /// Cancel whatever is playing; a no-op when idle
    pub fn stop(&mut self) {
        if let Some(canceller) = self.active.take() {
            canceller.cancel();
            tracing::debug!("active playback cancelled");
        }
    }

    /// Whether a request is still in flight. A request that finished
    /// naturally drops its token, which reads as inactive here; the check
    /// can still race a request finishing right after it.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|c| !c.tx.is_closed())
    }
}

/// Drive one request: remote attempt, then local fallback
async fn run_request(
    remote: Option<Arc<dyn RemoteSynthesizer>>,
    sink: Arc<dyn AudioSink>,
    local: Arc<dyn LocalSynthesizer>,
    default_voice: &str,
    text: &str,
    language: &str,
    mut cancel: CancelToken,
) -> PlaybackOutcome {
    if cancel.is_cancelled() {
        return PlaybackOutcome::Cancelled;
    }

    if let Some(remote) = remote {
        let voice = remote_voice_for(language, default_voice);
        tracing::debug!(voice, chars = text.chars().count(), "remote synthesis");

        let synthesis = tokio::select! {
            result = remote.synthesize(text, voice) => Some(result),
            () = cancel.cancelled() => None,
        };

        match synthesis {
            None => return PlaybackOutcome::Cancelled,
            Some(Ok(audio)) => match sink.play(&audio, cancel.clone()).await {
                Ok(()) if cancel.is_cancelled() => return PlaybackOutcome::Cancelled,
                Ok(()) => return PlaybackOutcome::Completed(PlaybackSource::Remote),
                Err(e) => {
                    tracing::warn!(error = %e, "remote audio playback failed, falling back");
                }
            },
            Some(Err(e)) => {
                // Logged and recovered; never a user-facing failure.
                tracing::warn!(error = %e, "remote synthesis failed, falling back");
            }
        }
    } else {
        tracing::debug!("no remote credentials, using local synthesis");
    }

    speak_locally(&*local, text, language, cancel).await
}

/// Local fallback: pick the best voice for the language and speak
async fn speak_locally(
    local: &dyn LocalSynthesizer,
    text: &str,
    language: &str,
    mut cancel: CancelToken,
) -> PlaybackOutcome {
    if cancel.is_cancelled() {
        return PlaybackOutcome::Cancelled;
    }

    // Voice lists can load asynchronously; give a just-started platform a
    // moment, then settle for whatever is there. Each request re-selects,
    // so a better voice appearing later is picked up best-effort.
    let mut voices = local.voices();
    if voices.is_empty() {
        let mut changed = local.voices_changed();
        let _ = tokio::time::timeout(VOICE_LIST_GRACE, changed.changed()).await;
        voices = local.voices();
    }

    let Some(voice) = select_voice(&voices, language).cloned() else {
        tracing::error!(language, "no local voice available, playback dropped");
        return PlaybackOutcome::Failed;
    };

    let rate = rate_for_language(language);
    tracing::debug!(voice = %voice.id, rate, "local synthesis");

    let spoken = tokio::select! {
        result = local.speak(text, &voice, rate, cancel.clone()) => Some(result),
        () = cancel.cancelled() => None,
    };

    match spoken {
        None => PlaybackOutcome::Cancelled,
        Some(Ok(())) if cancel.is_cancelled() => PlaybackOutcome::Cancelled,
        Some(Ok(())) => PlaybackOutcome::Completed(PlaybackSource::Local),
        Some(Err(e)) => {
            tracing::error!(error = %e, "local synthesis failed, playback dropped");
            PlaybackOutcome::Failed
        }
    }
}

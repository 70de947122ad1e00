//! Hardware-free fake providers for integration tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};

use voiceloop::playback::{
    AudioSink, CancelToken, LocalSynthesizer, LocalVoice, RemoteSynthesizer, SynthesisError,
    VoiceQuality,
};
use voiceloop::{CaptureEvent, CaptureProvider, Error, Result, TranscriptChunk};

/// Capture provider that replays a scripted event sequence with delays
pub struct ScriptedCapture {
    events: VecDeque<(Duration, CaptureEvent)>,
    /// Hang (instead of closing the stream) once the script runs out, so
    /// session timers decide the outcome
    hang_when_done: bool,
    pub aborted: Arc<AtomicBool>,
    pub stopped: Arc<AtomicBool>,
}

impl ScriptedCapture {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
            hang_when_done: true,
            aborted: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Emit an event `delay_ms` after the previous one
    #[must_use]
    pub fn after_ms(mut self, delay_ms: u64, event: CaptureEvent) -> Self {
        self.events
            .push_back((Duration::from_millis(delay_ms), event));
        self
    }

    /// Close the event stream after the scripted events instead of hanging
    #[must_use]
    pub fn then_close(mut self) -> Self {
        self.hang_when_done = false;
        self
    }

    pub fn interim(text: &str) -> CaptureEvent {
        CaptureEvent::Chunk(TranscriptChunk::interim(text))
    }

    pub fn final_(text: &str) -> CaptureEvent {
        CaptureEvent::Chunk(TranscriptChunk::final_(text))
    }
}

#[async_trait]
impl CaptureProvider for ScriptedCapture {
    async fn start(&mut self) -> Result<()> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.aborted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<CaptureEvent> {
        match self.events.pop_front() {
            Some((delay, event)) => {
                tokio::time::sleep(delay).await;
                Some(event)
            }
            None if self.hang_when_done => {
                std::future::pending().await
            }
            None => None,
        }
    }
}

/// What the fake remote synthesizer should do
#[derive(Clone)]
pub enum RemoteBehavior {
    /// Return the text bytes as "audio"
    Succeed,
    /// Fail with the explicit fallback signal
    Unavailable,
    /// Fail with a transient error
    Retryable,
}

pub struct FakeRemote {
    behavior: RemoteBehavior,
    pub calls: Arc<AtomicUsize>,
}

impl FakeRemote {
    pub fn new(behavior: RemoteBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl RemoteSynthesizer for FakeRemote {
    async fn synthesize(
        &self,
        text: &str,
        _voice_id: &str,
    ) -> std::result::Result<Vec<u8>, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            RemoteBehavior::Succeed => Ok(text.as_bytes().to_vec()),
            RemoteBehavior::Unavailable => {
                Err(SynthesisError::Unavailable("quota exhausted".to_string()))
            }
            RemoteBehavior::Retryable => {
                Err(SynthesisError::Retryable("connection reset".to_string()))
            }
        }
    }
}

/// Sink that records which audio actually played to completion
pub struct RecordingSink {
    play_duration: Duration,
    pub completed: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingSink {
    pub fn new(play_duration: Duration) -> Self {
        Self {
            play_duration,
            completed: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, audio: &[u8], mut cancel: CancelToken) -> Result<()> {
        tokio::select! {
            () = tokio::time::sleep(self.play_duration) => {
                self.completed.lock().await.push(audio.to_vec());
                Ok(())
            }
            () = cancel.cancelled() => Ok(()),
        }
    }
}

/// Local synthesizer with a mutable voice inventory
pub struct FakeLocal {
    voices: std::sync::Mutex<Vec<LocalVoice>>,
    voices_tx: watch::Sender<()>,
    fail: bool,
    /// (text, voice id, rate) per completed utterance
    pub spoken: Arc<Mutex<Vec<(String, String, f32)>>>,
}

impl FakeLocal {
    pub fn new() -> Self {
        let (voices_tx, _) = watch::channel(());
        Self {
            voices: std::sync::Mutex::new(Vec::new()),
            voices_tx,
            fail: false,
            spoken: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_voice(language: &str, quality: VoiceQuality) -> Self {
        let fake = Self::new();
        fake.add_voice(language, quality);
        fake
    }

    pub fn failing() -> Self {
        let mut fake = Self::with_voice("en", VoiceQuality::Standard);
        fake.fail = true;
        fake
    }

    pub fn add_voice(&self, language: &str, quality: VoiceQuality) {
        self.voices.lock().unwrap().push(LocalVoice {
            id: format!("{language}-voice"),
            language: language.to_string(),
            quality,
        });
        let _ = self.voices_tx.send(());
    }
}

#[async_trait]
impl LocalSynthesizer for FakeLocal {
    fn voices(&self) -> Vec<LocalVoice> {
        self.voices.lock().unwrap().clone()
    }

    fn voices_changed(&self) -> watch::Receiver<()> {
        self.voices_tx.subscribe()
    }

    async fn speak(
        &self,
        text: &str,
        voice: &LocalVoice,
        rate: f32,
        mut cancel: CancelToken,
    ) -> Result<()> {
        if self.fail {
            return Err(Error::LocalSynthesisUnsupported(
                "engine refused".to_string(),
            ));
        }
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(50)) => {
                self.spoken
                    .lock()
                    .await
                    .push((text.to_string(), voice.id.clone(), rate));
                Ok(())
            }
            () = cancel.cancelled() => Ok(()),
        }
    }
}

//! Audio output to the default device
//!
//! Decodes remote synthesis output (MP3) and plays it through cpal,
//! checking the cancel token so a superseded request goes silent
//! mid-stream.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use tokio::sync::watch;

use crate::playback::{AudioSink, CancelToken, LocalSynthesizer, LocalVoice};
use crate::{Error, Result};

/// Sample rate remote TTS providers commonly emit
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// How often the playback loop checks for completion or cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Plays MP3 audio to the default output device
pub struct DeviceAudioSink {
    config: StreamConfig,
}

impl DeviceAudioSink {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no suitable output device exists
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() <= 2
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio sink initialized"
        );

        Ok(Self { config })
    }

    /// Blocking playback on the current thread; cancellation observed via
    /// the token between poll intervals
    fn play_samples_blocking(&self, samples: Vec<f32>, cancel: &CancelToken) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device".to_string()))?;

        let config = self.config.clone();
        let channels = config.channels as usize;

        let total = samples.len();
        let samples = Arc::new(samples);
        let position = Arc::new(AtomicUsize::new(0));

        let samples_cb = Arc::clone(&samples);
        let position_cb = Arc::clone(&position);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position_cb.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let sample = samples_cb.get(pos).copied().unwrap_or(0.0);
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                        if pos < samples_cb.len() {
                            pos += 1;
                        }
                    }
                    position_cb.store(pos, Ordering::Relaxed);
                },
                |err| {
                    tracing::error!(error = %err, "audio output error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = (total as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
        let deadline = std::time::Instant::now() + Duration::from_millis(duration_ms + 500);

        while position.load(Ordering::Relaxed) < total {
            if cancel.is_cancelled() {
                tracing::debug!("playback cancelled mid-stream");
                break;
            }
            if std::time::Instant::now() > deadline {
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        drop(stream);
        Ok(())
    }
}

#[async_trait]
impl AudioSink for DeviceAudioSink {
    async fn play(&self, audio: &[u8], cancel: CancelToken) -> Result<()> {
        let samples = decode_mp3(audio)?;
        let sink = Self {
            config: self.config.clone(),
        };
        // cpal streams are not Send; keep the stream on a blocking thread.
        tokio::task::spawn_blocking(move || sink.play_samples_blocking(samples, &cancel))
            .await
            .map_err(|e| Error::Audio(e.to_string()))?
    }
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}

/// Local synthesizer for hosts without an on-device speech engine
///
/// Reports no voices and fails every request with
/// [`Error::LocalSynthesisUnsupported`]; the orchestrator logs the drop.
#[derive(Debug)]
pub struct NullLocalSynthesizer {
    voices_tx: watch::Sender<()>,
}

impl NullLocalSynthesizer {
    /// Create the null synthesizer
    #[must_use]
    pub fn new() -> Self {
        let (voices_tx, _) = watch::channel(());
        Self { voices_tx }
    }
}

impl Default for NullLocalSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalSynthesizer for NullLocalSynthesizer {
    fn voices(&self) -> Vec<LocalVoice> {
        Vec::new()
    }

    fn voices_changed(&self) -> watch::Receiver<()> {
        self.voices_tx.subscribe()
    }

    async fn speak(
        &self,
        _text: &str,
        voice: &LocalVoice,
        _rate: f32,
        _cancel: CancelToken,
    ) -> Result<()> {
        Err(Error::LocalSynthesisUnsupported(format!(
            "no speech engine for voice {}",
            voice.id
        )))
    }
}

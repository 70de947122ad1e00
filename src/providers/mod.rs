//! Concrete capability providers
//!
//! Available providers:
//! - HTTP remote synthesizer (OpenAI-style speech endpoint)
//! - cpal audio sink for playing remote synthesis output
//! - null local synthesizer for hosts without an on-device engine

mod device;
mod http_tts;

pub use device::{DeviceAudioSink, NullLocalSynthesizer};
pub use http_tts::HttpSynthesizer;

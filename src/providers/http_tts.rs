//! Remote synthesizer over an OpenAI-style speech endpoint

use async_trait::async_trait;

use crate::playback::{RemoteSynthesizer, SynthesisError};

/// Error payload some providers return with an explicit fallback flag
#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    fallback: bool,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(serde::Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Synthesizes speech via an HTTP request/response call
pub struct HttpSynthesizer {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl HttpSynthesizer {
    /// Create a synthesizer for the given endpoint
    #[must_use]
    pub fn new(url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl RemoteSynthesizer for HttpSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
    ) -> std::result::Result<Vec<u8>, SynthesisError> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
        }

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: voice_id,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| SynthesisError::Retryable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            // Quota and auth failures will not heal on retry; so will any
            // payload that carries an explicit fallback flag.
            let explicit_fallback = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.fallback)
                .unwrap_or(false);
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .map_or(body.clone(), |d| d.message);

            if explicit_fallback
                || status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::PAYMENT_REQUIRED
                || status == reqwest::StatusCode::TOO_MANY_REQUESTS
            {
                return Err(SynthesisError::Unavailable(format!("{status}: {detail}")));
            }
            return Err(SynthesisError::Retryable(format!("{status}: {detail}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Retryable(e.to_string()))?;

        tracing::debug!(bytes = audio.len(), "remote synthesis succeeded");
        Ok(audio.to_vec())
    }
}

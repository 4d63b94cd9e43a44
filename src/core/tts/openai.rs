//! OpenAI TTS client implementation.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://api.openai.com/v1/audio/speech`
//! - Models: tts-1, tts-1-hd, gpt-4o-mini-tts
//! - Output: raw PCM requested here so the playback path can re-chunk it

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;

use super::base::{TextToSpeech, TtsError, TtsResult};

/// Default OpenAI API base URL
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI speech synthesis client.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    voice: String,
}

impl OpenAiSpeech {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self::with_base_url(api_key, model, voice, OPENAI_API_BASE)
    }

    /// Point the client at an OpenAI-compatible endpoint (also used by tests).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            voice: voice.into(),
        }
    }
}

#[async_trait]
impl TextToSpeech for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> TtsResult<Bytes> {
        if self.api_key.is_empty() {
            return Err(TtsError::MissingCredentials);
        }

        let body = json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "response_format": "pcm",
        });

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?)
    }
}

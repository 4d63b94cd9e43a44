//! OpenAI STT (Whisper) client implementation.
//!
//! Whisper is a REST API, not a streaming one: the caller hands over one
//! complete PCM clip, this client wraps it in a WAV container and uploads it
//! as a multipart form.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://api.openai.com/v1/audio/transcriptions`
//! - Input: WAV (among others), 16-bit signed little-endian mono

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::base::{SpeechToText, SttError, SttResult};

/// Default OpenAI API base URL
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI Whisper transcription client.
pub struct OpenAiWhisper {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiWhisper {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, OPENAI_API_BASE)
    }

    /// Point the client at an OpenAI-compatible endpoint (also used by tests).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

/// Wrap raw PCM 16-bit mono samples in a WAV container.
///
/// The header is generated in memory; the sample payload is copied once.
fn wav_encode(pcm: &[u8], sample_rate: u32) -> SttResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| SttError::Encoding(e.to_string()))?;
        for sample in pcm.chunks_exact(2) {
            let value = i16::from_le_bytes([sample[0], sample[1]]);
            writer
                .write_sample(value)
                .map_err(|e| SttError::Encoding(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| SttError::Encoding(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

#[async_trait]
impl SpeechToText for OpenAiWhisper {
    async fn transcribe(&self, clip: Bytes, sample_rate: u32) -> SttResult<String> {
        if self.api_key.is_empty() {
            return Err(SttError::MissingCredentials);
        }

        let wav = wav_encode(&clip, sample_rate)?;
        debug!(
            clip_bytes = clip.len(),
            wav_bytes = wav.len(),
            "Uploading audio clip for transcription"
        );

        let part = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| SttError::Encoding(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SttError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value = response.json().await?;
        payload["text"]
            .as_str()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| SttError::MalformedResponse("missing `text` field".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_encode_header_and_payload() {
        let pcm: Vec<u8> = vec![0x01, 0x00, 0xFF, 0x7F, 0x00, 0x80];
        let wav = wav_encode(&pcm, 8000).expect("should encode");

        // RIFF/WAVE magic plus the untouched sample payload at the tail
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[wav.len() - pcm.len()..], pcm.as_slice());
    }

    #[test]
    fn test_wav_encode_empty_clip() {
        let wav = wav_encode(&[], 8000).expect("empty clip still yields a header");
        assert_eq!(&wav[..4], b"RIFF");
    }
}

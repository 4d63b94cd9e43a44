//! OpenAI chat-completion client implementation.
//!
//! Streams completions from the Chat Completions API with `stream: true`,
//! decoding the server-sent-event lines into plain text chunks.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://api.openai.com/v1/chat/completions`
//! - Chunks arrive as `data: {json}` lines terminated by `data: [DONE]`

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tracing::debug;

use super::base::{ChatCompletionStream, ChatMessage, LlmError, LlmResult, TokenStream};

/// Default OpenAI API base URL
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI Chat Completions client.
///
/// The HTTP client is reused across requests for connection pooling; one
/// instance serves any number of concurrent sessions.
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiChat {
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

#[async_trait]
impl ChatCompletionStream for OpenAiChat {
    async fn stream_chat(&self, messages: &[ChatMessage]) -> LlmResult<TokenStream> {
        if self.api_key.is_empty() {
            return Err(LlmError::MissingCredentials);
        }

        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let mut upstream = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut buffer = String::new();
            'outer: while let Some(chunk) = upstream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(LlmError::Request(e));
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer.drain(..=line_end);

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        break 'outer;
                    }
                    match serde_json::from_str::<serde_json::Value>(data) {
                        Ok(event) => {
                            if let Some(content) = event["choices"][0]["delta"]["content"].as_str()
                                && !content.is_empty()
                            {
                                yield Ok(content.to_string());
                            }
                        }
                        Err(e) => {
                            debug!("Skipping undecodable completion chunk: {e}");
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

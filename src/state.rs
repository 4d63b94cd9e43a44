//! Shared application state.
//!
//! All external collaborators are held here as stateless trait-object
//! handles with process-wide lifetime, injected into each session at
//! construction. Nothing in this struct is session-specific.

use std::sync::Arc;

use crate::config::{ConfigError, ServerConfig};
use crate::core::call::{CallControl, TwilioCallControl};
use crate::core::crm::{CallLogger, WebhookCallLogger};
use crate::core::llm::{ChatCompletionStream, OpenAiChat};
use crate::core::stt::{OpenAiWhisper, SpeechToText};
use crate::core::tts::{OpenAiSpeech, TextToSpeech};
use crate::session::IntentDetector;

/// Application state shared across all connections.
pub struct AppState {
    pub config: ServerConfig,
    /// Compiled once from the configured keyword vocabulary
    pub intent: IntentDetector,
    pub llm: Arc<dyn ChatCompletionStream>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
    /// Absent when no CRM webhook is configured; handoff then skips logging
    pub crm: Option<Arc<dyn CallLogger>>,
    /// Absent when out-of-band call updates are not configured
    pub call_control: Option<Arc<dyn CallControl>>,
}

fn compile_intent(config: &ServerConfig) -> Result<IntentDetector, ConfigError> {
    IntentDetector::new(&config.agent.intent_keywords)
        .map_err(|e| ConfigError::Validation(format!("intent keywords do not compile: {e}")))
}

impl AppState {
    /// Wire the default provider clients from configuration.
    pub fn from_config(config: ServerConfig) -> Result<Self, ConfigError> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            ConfigError::Validation("OPENAI_API_KEY must be set".to_string())
        })?;

        let agent = &config.agent;
        let (llm, stt, tts): (
            Arc<dyn ChatCompletionStream>,
            Arc<dyn SpeechToText>,
            Arc<dyn TextToSpeech>,
        ) = match config.openai_base_url.as_deref() {
            Some(base) => (
                Arc::new(OpenAiChat::with_base_url(
                    api_key.as_str(),
                    agent.llm_model.as_str(),
                    base,
                )),
                Arc::new(OpenAiWhisper::with_base_url(
                    api_key.as_str(),
                    agent.stt_model.as_str(),
                    base,
                )),
                Arc::new(OpenAiSpeech::with_base_url(
                    api_key.as_str(),
                    agent.tts_model.as_str(),
                    agent.tts_voice.as_str(),
                    base,
                )),
            ),
            None => (
                Arc::new(OpenAiChat::new(api_key.as_str(), agent.llm_model.as_str())),
                Arc::new(OpenAiWhisper::new(
                    api_key.as_str(),
                    agent.stt_model.as_str(),
                )),
                Arc::new(OpenAiSpeech::new(
                    api_key.as_str(),
                    agent.tts_model.as_str(),
                    agent.tts_voice.as_str(),
                )),
            ),
        };

        let crm: Option<Arc<dyn CallLogger>> = config
            .crm_webhook_url
            .as_deref()
            .map(|url| Arc::new(WebhookCallLogger::new(url)) as Arc<dyn CallLogger>);

        let call_control: Option<Arc<dyn CallControl>> = match (
            config.twilio_account_sid.as_deref(),
            config.twilio_auth_token.as_deref(),
        ) {
            (Some(sid), Some(token)) => {
                Some(Arc::new(TwilioCallControl::new(sid, token)) as Arc<dyn CallControl>)
            }
            _ => None,
        };

        let intent = compile_intent(&config)?;

        Ok(Self {
            config,
            intent,
            llm,
            stt,
            tts,
            crm,
            call_control,
        })
    }

    /// Assemble state from explicit collaborators (tests inject mocks here).
    pub fn with_collaborators(
        config: ServerConfig,
        llm: Arc<dyn ChatCompletionStream>,
        stt: Arc<dyn SpeechToText>,
        tts: Arc<dyn TextToSpeech>,
        crm: Option<Arc<dyn CallLogger>>,
        call_control: Option<Arc<dyn CallControl>>,
    ) -> Result<Self, ConfigError> {
        let intent = compile_intent(&config)?;
        Ok(Self {
            config,
            intent,
            llm,
            stt,
            tts,
            crm,
            call_control,
        })
    }
}

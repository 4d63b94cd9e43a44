//! Configuration module for the SDR gateway
//!
//! Configuration is read from environment variables (with `.env` loaded by the
//! binary before this module runs). Every value has a default except the
//! provider credentials, which stay `Option` and are validated where they are
//! first needed.
//!
//! # Example
//! ```rust,no_run
//! use sdr_gateway::config::ServerConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Default keyword vocabulary for scheduling-intent detection.
pub const DEFAULT_INTENT_KEYWORDS: [&str; 5] = ["schedule", "book", "meeting", "demo", "calendar"];

/// Default closing message spoken to the caller once scheduling intent fires.
pub const DEFAULT_CLOSING_MESSAGE: &str =
    "Great, let me connect you with a specialist who can get that scheduled. One moment.";

/// Default system prompt seeding every conversation transcript.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful sales development representative. \
     Answer briefly and conversationally; you are speaking on a phone call.";

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable was present but could not be parsed
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    /// A validation rule on the assembled configuration failed
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Per-agent conversation policy.
///
/// These knobs are the points where the prototype variants of this system
/// diverged; they are configuration, not code.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// System prompt inserted as the first transcript turn of every session
    pub system_prompt: String,
    /// Chat model used for completions
    pub llm_model: String,
    /// Transcription model for buffered caller audio
    pub stt_model: String,
    /// Speech synthesis model for paced playback
    pub tts_model: String,
    /// Speech synthesis voice
    pub tts_voice: String,
    /// Keyword vocabulary for scheduling-intent detection
    pub intent_keywords: Vec<String>,
    /// Also run intent detection over the agent's own reply
    pub scan_reply: bool,
    /// Closing message sent when handoff triggers (distinct from the model reply)
    pub closing_message: String,
    /// Pause between the closing message and the end-of-call event
    pub handoff_delay: Duration,
    /// Whether the inbound media path (buffer + transcribe) and paced playback are active
    pub audio_enabled: bool,
    /// Sample rate of buffered caller audio, Hz
    pub audio_sample_rate: u32,
    /// Size of each outbound media frame during paced playback, bytes
    pub playback_chunk_bytes: usize,
    /// Interval between outbound media frames during paced playback
    pub playback_interval: Duration,
    /// Deliver completed replies through the call-control collaborator instead
    /// of relying on in-band text frames alone
    pub reply_via_call_update: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            intent_keywords: DEFAULT_INTENT_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            scan_reply: false,
            closing_message: DEFAULT_CLOSING_MESSAGE.to_string(),
            handoff_delay: Duration::from_millis(2500),
            audio_enabled: false,
            audio_sample_rate: 8000,
            playback_chunk_bytes: 3200,
            playback_interval: Duration::from_millis(100),
            reply_via_call_update: false,
        }
    }
}

/// Server configuration
///
/// Contains everything needed to run the gateway: listener settings, provider
/// credentials, and the agent conversation policy.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    /// OpenAI API key for chat completions, Whisper STT and speech synthesis
    pub openai_api_key: Option<String>,
    /// Override for the OpenAI-compatible API base URL
    pub openai_base_url: Option<String>,

    /// CRM webhook endpoint receiving the structured call summary on handoff
    pub crm_webhook_url: Option<String>,

    /// Twilio account SID for out-of-band call updates
    pub twilio_account_sid: Option<String>,
    /// Twilio auth token for out-of-band call updates
    pub twilio_auth_token: Option<String>,

    /// Agent conversation policy
    pub agent: AgentConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables, applying defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let agent = AgentConfig {
            system_prompt: env_string("AGENT_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            llm_model: env_string("LLM_MODEL", "gpt-4o-mini"),
            stt_model: env_string("STT_MODEL", "whisper-1"),
            tts_model: env_string("TTS_MODEL", "tts-1"),
            tts_voice: env_string("TTS_VOICE", "alloy"),
            intent_keywords: env_keywords("INTENT_KEYWORDS"),
            scan_reply: env_bool("INTENT_SCAN_REPLY", false)?,
            closing_message: env_string("CLOSING_MESSAGE", DEFAULT_CLOSING_MESSAGE),
            handoff_delay: Duration::from_millis(env_parse("HANDOFF_DELAY_MS", 2500u64)?),
            audio_enabled: env_bool("AUDIO_ENABLED", false)?,
            audio_sample_rate: env_parse("AUDIO_SAMPLE_RATE", 8000u32)?,
            playback_chunk_bytes: env_parse("PLAYBACK_CHUNK_BYTES", 3200usize)?,
            playback_interval: Duration::from_millis(env_parse("PLAYBACK_INTERVAL_MS", 100u64)?),
            reply_via_call_update: env_bool("REPLY_VIA_CALL_UPDATE", false)?,
        };

        let config = Self {
            host: env_string("HOST", "0.0.0.0"),
            port: env_parse("PORT", 8080u16)?,
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_base_url: env_opt("OPENAI_BASE_URL"),
            crm_webhook_url: env_opt("CRM_WEBHOOK_URL"),
            twilio_account_sid: env_opt("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: env_opt("TWILIO_AUTH_TOKEN"),
            agent,
        };

        config.validate()?;
        Ok(config)
    }

    /// Socket address string for the listener.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.intent_keywords.is_empty() {
            return Err(ConfigError::Validation(
                "INTENT_KEYWORDS must contain at least one keyword".to_string(),
            ));
        }
        if self.agent.playback_chunk_bytes == 0 {
            return Err(ConfigError::Validation(
                "PLAYBACK_CHUNK_BYTES must be greater than zero".to_string(),
            ));
        }
        if self.agent.audio_sample_rate == 0 {
            return Err(ConfigError::Validation(
                "AUDIO_SAMPLE_RATE must be greater than zero".to_string(),
            ));
        }
        if self.twilio_account_sid.is_some() != self.twilio_auth_token.is_some() {
            return Err(ConfigError::Validation(
                "TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN must be set together".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_string(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env_opt(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match env_opt(name) {
        Some(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                value,
            }),
        },
        None => Ok(default),
    }
}

/// Parse a comma-separated keyword list, falling back to the default set.
fn env_keywords(name: &str) -> Vec<String> {
    match env_opt(name) {
        Some(value) => value
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect(),
        None => DEFAULT_INTENT_KEYWORDS
            .iter()
            .map(|k| k.to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "HOST",
            "PORT",
            "OPENAI_API_KEY",
            "OPENAI_BASE_URL",
            "CRM_WEBHOOK_URL",
            "TWILIO_ACCOUNT_SID",
            "TWILIO_AUTH_TOKEN",
            "AGENT_SYSTEM_PROMPT",
            "LLM_MODEL",
            "STT_MODEL",
            "TTS_MODEL",
            "TTS_VOICE",
            "INTENT_KEYWORDS",
            "INTENT_SCAN_REPLY",
            "CLOSING_MESSAGE",
            "HANDOFF_DELAY_MS",
            "AUDIO_ENABLED",
            "AUDIO_SAMPLE_RATE",
            "PLAYBACK_CHUNK_BYTES",
            "PLAYBACK_INTERVAL_MS",
            "REPLY_VIA_CALL_UPDATE",
        ] {
            unsafe { env::remove_var(name) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ServerConfig::from_env().expect("defaults should load");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.agent.handoff_delay, Duration::from_millis(2500));
        assert_eq!(config.agent.playback_chunk_bytes, 3200);
        assert_eq!(
            config.agent.intent_keywords,
            vec!["schedule", "book", "meeting", "demo", "calendar"]
        );
        assert!(!config.agent.scan_reply);
        assert!(!config.agent.audio_enabled);
    }

    #[test]
    #[serial]
    fn test_keyword_override_is_lowercased() {
        clear_env();
        unsafe { env::set_var("INTENT_KEYWORDS", "Schedule, APPOINTMENT ,  ") };
        let config = ServerConfig::from_env().expect("should load");
        assert_eq!(config.agent.intent_keywords, vec!["schedule", "appointment"]);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_rejected() {
        clear_env();
        unsafe { env::set_var("PORT", "not-a-port") };
        let err = ServerConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_twilio_credentials_must_pair() {
        clear_env();
        unsafe { env::set_var("TWILIO_ACCOUNT_SID", "AC123") };
        let err = ServerConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_address_formatting() {
        clear_env();
        unsafe { env::set_var("HOST", "127.0.0.1") };
        unsafe { env::set_var("PORT", "9090") };
        let config = ServerConfig::from_env().expect("should load");
        assert_eq!(config.address(), "127.0.0.1:9090");
        clear_env();
    }
}

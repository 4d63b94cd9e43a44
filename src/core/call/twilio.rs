//! Twilio implementation of the out-of-band call-control collaborator.
//!
//! # API Reference
//!
//! - Endpoint: `POST /2010-04-01/Accounts/{AccountSid}/Calls/{CallSid}.json`
//! - Auth: HTTP basic with account SID / auth token
//! - The reply is delivered as inline TwiML

use async_trait::async_trait;
use tracing::debug;

use super::base::{CallControl, CallControlError, CallControlResult};

/// Default Twilio REST API base URL
pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Twilio call-update client.
pub struct TwilioCallControl {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    base_url: String,
}

impl TwilioCallControl {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self::with_base_url(account_sid, auth_token, TWILIO_API_BASE)
    }

    /// Point the client at an alternate endpoint (also used by tests).
    pub fn with_base_url(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Escape reply text for embedding in a TwiML document.
fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[async_trait]
impl CallControl for TwilioCallControl {
    async fn update_reply(&self, call_identifier: &str, text: &str) -> CallControlResult<()> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Calls/{}.json",
            self.base_url, self.account_sid, call_identifier
        );
        let twiml = format!("<Response><Say>{}</Say></Response>", xml_escape(text));

        debug!(call_identifier, "Updating live call response");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Twiml", twiml.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallControlError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

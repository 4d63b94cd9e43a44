//! Webhook implementation of the CRM/logging collaborator.
//!
//! Delivers the call summary as a JSON POST to a configured endpoint. Any
//! system that can receive a webhook (HubSpot workflows, Zapier, an internal
//! collector) works unchanged.

use async_trait::async_trait;
use tracing::debug;

use super::base::{CallLogger, CallRecord, CrmError, CrmResult};

/// CRM collaborator posting call summaries to a webhook endpoint.
pub struct WebhookCallLogger {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookCallLogger {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl CallLogger for WebhookCallLogger {
    async fn log_call(&self, record: &CallRecord) -> CrmResult<()> {
        debug!(
            call_identifier = %record.call_identifier,
            correlation_id = %record.correlation_id,
            "Posting call summary"
        );

        let response = self.client.post(&self.endpoint).json(record).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrmError::Collaborator {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

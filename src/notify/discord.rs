use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{lead_message, Notifier};
use crate::lead::Lead;

/// Posts `{"content": ...}` to a Discord-compatible webhook. One attempt, no retries.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, webhook_url: &str, lead: &Lead) -> Result<()> {
        let content = lead_message(lead);
        let rsp = self
            .client
            .post(webhook_url)
            .timeout(self.timeout)
            .json(&WebhookPayload { content: &content })
            .send()
            .await
            .map_err(|e| anyhow!("webhook request failed: {e}"))?;

        if let Err(e) = rsp.error_for_status_ref() {
            return Err(anyhow!("webhook HTTP error: {e}"));
        }
        Ok(())
    }
}

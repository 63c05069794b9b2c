pub mod discord;
pub mod email;

use anyhow::Result;

use crate::lead::Lead;

pub use discord::WebhookNotifier;
pub use email::Mailer;

/// Fire-and-forget alert for a freshly persisted lead.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, webhook_url: &str, lead: &Lead) -> Result<()>;
}

/// Markdown body posted for a new lead.
pub fn lead_message(lead: &Lead) -> String {
    format!(
        "🚨 **NEW LEAD DETECTED** 🚨\n**Keyword:** `{}`\n**Source:** {}\n**Title:** {}\n**Link:** {}",
        lead.tag(),
        lead.source(),
        lead.title(),
        lead.url()
    )
}

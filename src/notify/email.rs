use anyhow::{bail, Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use crate::config::SmtpSettings;

/// Sends outreach mail through the configured SMTP relay.
///
/// Settings are passed per call, so edits to the `[smtp]` section apply to the
/// next send without a restart.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mailer;

impl Mailer {
    pub fn new() -> Self {
        Self
    }

    pub async fn send(&self, smtp: &SmtpSettings, to: &str, subject: &str, body: &str) -> Result<()> {
        let msg = build_message(smtp, to, subject, body)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp.host.trim())
            .with_context(|| format!("invalid SMTP host {}", smtp.host))?;
        if !smtp.username.trim().is_empty() {
            builder = builder.credentials(Credentials::new(
                smtp.username.trim().to_string(),
                smtp.password.clone(),
            ));
        }
        let mailer = builder.build();

        mailer.send(msg).await.context("send email")?;
        tracing::info!(target: "outreach", %to, "email sent");
        Ok(())
    }
}

fn build_message(smtp: &SmtpSettings, to: &str, subject: &str, body: &str) -> Result<Message> {
    if !smtp.is_configured() {
        bail!("SMTP is not configured (smtp.host / smtp.from)");
    }
    let from: Mailbox = smtp
        .from
        .trim()
        .parse()
        .with_context(|| format!("invalid from address {}", smtp.from))?;
    let to: Mailbox = to
        .trim()
        .parse()
        .with_context(|| format!("invalid recipient {to}"))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .header(header::ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .context("build email")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".into(),
            username: "u".into(),
            password: "p".into(),
            from: "Scanner <scanner@example.com>".into(),
        }
    }

    #[test]
    fn unconfigured_smtp_is_rejected() {
        let err = build_message(&SmtpSettings::default(), "a@b.c", "s", "b").unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn bad_recipient_is_reported() {
        let err = build_message(&smtp(), "not an address", "s", "b").unwrap_err();
        assert!(format!("{err:#}").contains("invalid recipient"));
    }

    #[test]
    fn valid_message_builds() {
        assert!(build_message(&smtp(), "dev@example.org", "Fix offer", "Hi").is_ok());
    }
}

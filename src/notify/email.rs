// src/notify/email.rs
use anyhow::{Context, Result};
use lettre::message::{Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use tracing::info;

use crate::config::SmtpSettings;

/// One-recipient HTML mailer over STARTTLS + login auth.
pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let creds = Credentials::new(settings.username.clone(), settings.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .with_context(|| format!("invalid SMTP host {}", settings.host))?
            .port(settings.port)
            .credentials(creds)
            .build();

        let from = settings
            .from
            .parse()
            .with_context(|| format!("invalid sender address {}", settings.from))?;
        let to = settings
            .to
            .parse()
            .with_context(|| format!("invalid recipient address {}", settings.to))?;

        Ok(Self { mailer, from, to })
    }

    /// Build the multipart/alternative message with a single HTML part.
    pub fn build_message(&self, subject: &str, html: &str) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .multipart(MultiPart::alternative().singlepart(SinglePart::html(html.to_string())))
            .context("build email")
    }

    pub async fn send_html(&self, subject: &str, html: &str) -> Result<()> {
        let msg = self.build_message(subject, html)?;
        self.mailer.send(msg).await.context("send email")?;
        info!(to = %self.to, "digest email sent");
        Ok(())
    }
}

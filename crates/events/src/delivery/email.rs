//! Email transport contract.

use async_trait::async_trait;

/// One outgoing message.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Email sender boundary.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send_mail(&self, mail: &OutgoingMail) -> anyhow::Result<()>;
}

/// Logs instead of sending. Used when no SMTP transport is configured.
pub struct LogEmailDispatcher;

#[async_trait]
impl EmailDispatcher for LogEmailDispatcher {
    async fn send_mail(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "Email delivery (log only)");
        Ok(())
    }
}

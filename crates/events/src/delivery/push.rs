//! Push-notification transport contract.

use async_trait::async_trait;

/// Multicast push sender. Tokens are opaque device registration strings.
#[async_trait]
pub trait PushDispatcher: Send + Sync {
    async fn send_multicast(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: &serde_json::Value,
    ) -> anyhow::Result<()>;
}

/// Logs instead of sending. Used when no push transport is configured.
pub struct LogPushDispatcher;

#[async_trait]
impl PushDispatcher for LogPushDispatcher {
    async fn send_multicast(
        &self,
        tokens: &[String],
        title: &str,
        _body: &str,
        _data: &serde_json::Value,
    ) -> anyhow::Result<()> {
        tracing::info!(recipients = tokens.len(), title, "Push delivery (log only)");
        Ok(())
    }
}

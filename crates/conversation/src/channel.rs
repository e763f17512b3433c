use async_trait::async_trait;
use tracing::info;

/// Outbound half of a messaging channel.
///
/// Delivery failures are the channel's problem: implementations log them and
/// report `false`, nothing is retried.
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    async fn send_text(&self, recipient_id: &str, text: &str) -> bool;
}

/// Writes outbound messages to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LoggingChannel;

#[async_trait]
impl OutboundChannel for LoggingChannel {
    async fn send_text(&self, recipient_id: &str, text: &str) -> bool {
        info!(recipient_id, text, "outbound message (not delivered)");
        true
    }
}

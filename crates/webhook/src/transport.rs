//! [`ChannelTransport`] implementation for generic webhooks: unlike the
//! bot/webchat adapters, there is no persistent connection to push frames
//! over. Each inbound HTTP call registers a one-shot reply slot keyed by a
//! synthetic `chat_id`; the first outbound call against that `chat_id`
//! resolves the slot, which unblocks the original HTTP handler (§4.1
//! synchronous request/response, §6.3).

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::oneshot;

use chatgate_channels::transport::{ChannelTransport, MessageId, Result, TransportError};
use chatgate_common::types::{Attachment, Button, ParseMode};
use chatgate_ratelimit::{bucket::RateLimiter, retry::call_transport};

/// One pending HTTP response per in-flight webhook call.
pub type PendingMap = Arc<DashMap<String, oneshot::Sender<String>>>;

pub struct WebhookTransport {
    pending: PendingMap,
    limiter: Arc<RateLimiter>,
}

impl WebhookTransport {
    #[must_use]
    pub fn new(pending: PendingMap, limiter: Arc<RateLimiter>) -> Self {
        Self { pending, limiter }
    }

    fn resolve(&self, chat_id: &str, text: String) -> std::result::Result<(), TransportError> {
        let (_, sender) = self
            .pending
            .remove(chat_id)
            .ok_or_else(|| TransportError::Fatal(format!("no pending webhook response for {chat_id}")))?;
        sender
            .send(text)
            .map_err(|_| TransportError::Fatal(format!("webhook caller for {chat_id} already disconnected")))
    }
}

#[async_trait]
impl ChannelTransport for WebhookTransport {
    async fn send_text(&self, chat_id: &str, text: &str, _parse_mode: ParseMode, _buttons: Option<&[Vec<Button>]>) -> Result<MessageId> {
        let text = text.to_string();
        call_transport(&self.limiter, chat_id, "send_text", || async { self.resolve(chat_id, text.clone()) }).await?;
        Ok(chat_id.to_string())
    }

    async fn edit_text(&self, chat_id: &str, _message_id: &str, text: &str, _parse_mode: ParseMode, _buttons: Option<&[Vec<Button>]>) -> Result<()> {
        let text = text.to_string();
        call_transport(&self.limiter, chat_id, "edit_text", || async { self.resolve(chat_id, text.clone()) }).await
    }

    async fn edit_reply_markup(&self, _chat_id: &str, _message_id: &str, _buttons: Option<&[Vec<Button>]>) -> Result<()> {
        Err(TransportError::Fatal("webhook transport has no reply markup to edit".to_string()))
    }

    async fn delete_message(&self, _chat_id: &str, _message_id: &str) -> Result<()> {
        Err(TransportError::Fatal("webhook transport cannot delete a delivered HTTP response".to_string()))
    }

    async fn react_message(&self, _chat_id: &str, _message_id: &str, _emoji: &str) -> Result<()> {
        Err(TransportError::Fatal("webhook transport does not support reactions".to_string()))
    }

    async fn send_poll(&self, _chat_id: &str, _question: &str, _options: &[String]) -> Result<MessageId> {
        Err(TransportError::Fatal("webhook transport does not support polls".to_string()))
    }

    async fn send_attachment(&self, chat_id: &str, attachment: &Attachment, caption: Option<&str>) -> Result<MessageId> {
        let text = caption.map(str::to_string).unwrap_or_else(|| format!("[attachment: {:?}]", attachment.kind));
        call_transport(&self.limiter, chat_id, "send_attachment", || async { self.resolve(chat_id, text.clone()) }).await?;
        Ok(chat_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatgate_ratelimit::bucket::RateLimiterConfig;

    fn unlimited_limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(RateLimiterConfig { max_requests: u32::MAX, window_ms: 60_000, per_user: true }))
    }

    #[tokio::test]
    async fn send_text_resolves_pending_reply() {
        let pending: PendingMap = Arc::new(DashMap::new());
        let (tx, rx) = oneshot::channel();
        pending.insert("call-1".to_string(), tx);
        let transport = WebhookTransport::new(pending, unlimited_limiter());

        transport.send_text("call-1", "done", ParseMode::Plain, None).await.unwrap();
        assert_eq!(rx.await.unwrap(), "done");
    }

    #[tokio::test]
    async fn send_text_without_pending_call_fails() {
        let pending: PendingMap = Arc::new(DashMap::new());
        let transport = WebhookTransport::new(pending, unlimited_limiter());
        let err = transport.send_text("missing", "hi", ParseMode::Plain, None).await.unwrap_err();
        assert!(matches!(err, TransportError::Fatal(_)));
    }
}

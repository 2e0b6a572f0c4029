//! [`ChannelTransport`] implementation for webchat: one instance per
//! account, routing `send_text`/`edit_text`/... calls to whichever live
//! WebSocket connection currently owns `chat_id`, through the shared rate
//! gate (§4.1 `callTransport`).

use std::sync::{Arc, atomic::{AtomicU64, Ordering}};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use chatgate_channels::transport::{ChannelTransport, MessageId, Result, TransportError};
use chatgate_common::types::{Attachment, Button, ParseMode};
use chatgate_ratelimit::{bucket::RateLimiter, retry::call_transport};

use crate::frame::ServerFrame;

/// Routing table from chat_id (one per live WS connection) to that
/// connection's outbound frame sender.
pub type ConnectionMap = Arc<DashMap<String, mpsc::UnboundedSender<ServerFrame>>>;

pub struct WebchatTransport {
    connections: ConnectionMap,
    limiter: Arc<RateLimiter>,
    next_id: AtomicU64,
}

impl WebchatTransport {
    #[must_use]
    pub fn new(connections: ConnectionMap, limiter: Arc<RateLimiter>) -> Self {
        Self { connections, limiter, next_id: AtomicU64::new(0) }
    }

    fn fresh_id(&self) -> String {
        format!("wc-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn send(&self, chat_id: &str, frame: ServerFrame) -> std::result::Result<(), TransportError> {
        let sender = self
            .connections
            .get(chat_id)
            .ok_or_else(|| TransportError::Fatal(format!("no live connection for chat {chat_id}")))?;
        sender
            .send(frame)
            .map_err(|_| TransportError::Fatal(format!("connection closed for chat {chat_id}")))
    }
}

#[async_trait]
impl ChannelTransport for WebchatTransport {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: ParseMode,
        buttons: Option<&[Vec<Button>]>,
    ) -> Result<MessageId> {
        let id = self.fresh_id();
        let buttons = buttons.map(<[Vec<Button>]>::to_vec);
        call_transport(&self.limiter, chat_id, "send_text", || {
            let frame = ServerFrame::Message { id: id.clone(), text: text.to_string(), parse_mode, buttons: buttons.clone() };
            async { self.send(chat_id, frame) }
        })
        .await?;
        Ok(id)
    }

    async fn edit_text(
        &self,
        chat_id: &str,
        message_id: &str,
        text: &str,
        parse_mode: ParseMode,
        buttons: Option<&[Vec<Button>]>,
    ) -> Result<()> {
        let buttons = buttons.map(<[Vec<Button>]>::to_vec);
        call_transport(&self.limiter, chat_id, "edit_text", || {
            let frame = ServerFrame::Edit {
                id: message_id.to_string(),
                text: text.to_string(),
                parse_mode,
                buttons: buttons.clone(),
            };
            async { self.send(chat_id, frame) }
        })
        .await
    }

    async fn edit_reply_markup(&self, chat_id: &str, message_id: &str, buttons: Option<&[Vec<Button>]>) -> Result<()> {
        let buttons = buttons.map(<[Vec<Button>]>::to_vec);
        call_transport(&self.limiter, chat_id, "edit_reply_markup", || {
            let frame = ServerFrame::EditButtons { id: message_id.to_string(), buttons: buttons.clone() };
            async { self.send(chat_id, frame) }
        })
        .await
    }

    async fn delete_message(&self, chat_id: &str, message_id: &str) -> Result<()> {
        call_transport(&self.limiter, chat_id, "delete_message", || {
            let frame = ServerFrame::Delete { id: message_id.to_string() };
            async { self.send(chat_id, frame) }
        })
        .await
    }

    async fn react_message(&self, chat_id: &str, message_id: &str, emoji: &str) -> Result<()> {
        call_transport(&self.limiter, chat_id, "react_message", || {
            let frame = ServerFrame::Reaction { id: message_id.to_string(), emoji: emoji.to_string() };
            async { self.send(chat_id, frame) }
        })
        .await
    }

    async fn send_poll(&self, chat_id: &str, question: &str, options: &[String]) -> Result<MessageId> {
        let id = self.fresh_id();
        call_transport(&self.limiter, chat_id, "send_poll", || {
            let frame = ServerFrame::Poll { id: id.clone(), question: question.to_string(), options: options.to_vec() };
            async { self.send(chat_id, frame) }
        })
        .await?;
        Ok(id)
    }

    async fn send_attachment(&self, chat_id: &str, attachment: &Attachment, caption: Option<&str>) -> Result<MessageId> {
        let id = self.fresh_id();
        call_transport(&self.limiter, chat_id, "send_attachment", || {
            let frame = ServerFrame::Attachment {
                id: id.clone(),
                attachment: attachment.clone(),
                caption: caption.map(str::to_string),
            };
            async { self.send(chat_id, frame) }
        })
        .await?;
        Ok(id)
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
    async fn send_text_routes_to_registered_connection() {
        let connections: ConnectionMap = Arc::new(DashMap::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        connections.insert("chat-1".to_string(), tx);
        let transport = WebchatTransport::new(connections, unlimited_limiter());

        transport.send_text("chat-1", "hello", ParseMode::Plain, None).await.unwrap();
        let frame = rx.recv().await.unwrap();
        assert!(matches!(frame, ServerFrame::Message { text, .. } if text == "hello"));
    }

    #[tokio::test]
    async fn send_text_to_unknown_chat_fails() {
        let connections: ConnectionMap = Arc::new(DashMap::new());
        let transport = WebchatTransport::new(connections, unlimited_limiter());
        let err = transport.send_text("missing", "hi", ParseMode::Plain, None).await.unwrap_err();
        assert!(matches!(err, TransportError::Fatal(_)));
    }
}

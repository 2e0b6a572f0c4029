//! The rate-limited, retry-safe transport primitive every channel adapter
//! wraps its outbound calls in (§4.1). A platform adapter (bot/webchat)
//! implements [`ChannelTransport`] against its own SDK; [`draft::DraftStream`]
//! and `chatgate_ratelimit::call_transport` are built generically on top of
//! it so neither the rate gate nor the draft-streaming state machine is
//! duplicated per platform.

use std::time::Duration;

use {
    async_trait::async_trait,
    chatgate_common::types::{Attachment, Button, OutgoingMessage, ParseMode},
};

/// §7 error taxonomy narrowed to what the transport boundary can report.
/// Categories 4-6 (validation/collaborator/internal) are not transport
/// errors and never appear here.
#[derive(Debug, Clone)]
pub enum TransportError {
    /// Category 1 — server back-pressure. `retry_after` mirrors a
    /// `Retry-After` header when the platform sends one.
    RateLimited { retry_after: Option<Duration> },
    /// Category 2 — e.g. Telegram's "message is not modified". Treated as
    /// success by callers that only care the edit landed.
    ContentUnchanged,
    /// Category 3 — auth failures, unknown chat, forbidden, or any other
    /// fatal transport-layer error. Propagates to the caller.
    Fatal(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited { retry_after } => {
                write!(f, "rate limited (retry_after={retry_after:?})")
            },
            Self::ContentUnchanged => write!(f, "content unchanged"),
            Self::Fatal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl chatgate_ratelimit::retry::RetrySignal for TransportError {
    fn retry_after(&self) -> Option<Option<Duration>> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Per-platform identifier for a sent message, opaque to callers above this
/// layer (Telegram message ids, webchat frame ids, ...).
pub type MessageId = String;

/// The primitives every channel adapter's authenticated connection exposes
/// (§4.1: `sendMessage`, `editMessage`, `editReplyMarkup`, `deleteMessage`,
/// `reactMessage`, `sendPoll`). Every method here is assumed to already be
/// behind the adapter's own `callTransport` wrapping — this trait only
/// describes *what* gets called, not the rate-gate/retry loop around it.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: ParseMode,
        buttons: Option<&[Vec<Button>]>,
    ) -> Result<MessageId>;

    async fn edit_text(
        &self,
        chat_id: &str,
        message_id: &str,
        text: &str,
        parse_mode: ParseMode,
        buttons: Option<&[Vec<Button>]>,
    ) -> Result<()>;

    async fn edit_reply_markup(
        &self,
        chat_id: &str,
        message_id: &str,
        buttons: Option<&[Vec<Button>]>,
    ) -> Result<()>;

    async fn delete_message(&self, chat_id: &str, message_id: &str) -> Result<()>;

    async fn react_message(&self, chat_id: &str, message_id: &str, emoji: &str) -> Result<()>;

    async fn send_poll(&self, chat_id: &str, question: &str, options: &[String]) -> Result<MessageId>;

    async fn send_attachment(
        &self,
        chat_id: &str,
        attachment: &Attachment,
        caption: Option<&str>,
    ) -> Result<MessageId>;
}

/// Dispatch a full [`OutgoingMessage`] over a [`ChannelTransport`] per the
/// attachment-send rule in §4.1: the first attachment consumes
/// `message.text` as its caption (exactly once); remaining attachments keep
/// their own caption; if no attachment ever carried the text, a trailing
/// text message is sent. Individual attachment failures are logged and
/// skipped — siblings still go out.
pub async fn send_outgoing(
    transport: &dyn ChannelTransport,
    message: &OutgoingMessage,
) -> Result<MessageId> {
    let attachments = message.attachments.as_deref().unwrap_or(&[]);
    if attachments.is_empty() {
        return transport
            .send_text(
                &message.chat_id,
                &message.text,
                message.parse_mode,
                message.buttons.as_deref(),
            )
            .await;
    }

    let mut text_consumed = false;
    let mut first_id = None;
    for attachment in attachments {
        let caption = if !text_consumed && !message.text.is_empty() {
            text_consumed = true;
            Some(message.text.as_str())
        } else {
            attachment.caption.as_deref()
        };
        match transport
            .send_attachment(&message.chat_id, attachment, caption)
            .await
        {
            Ok(id) => {
                if first_id.is_none() {
                    first_id = Some(id);
                }
            },
            Err(err) => {
                tracing::warn!(chat_id = %message.chat_id, error = %err, "skipping attachment");
            },
        }
    }

    if !text_consumed && !message.text.is_empty() {
        return transport
            .send_text(&message.chat_id, &message.text, message.parse_mode, None)
            .await;
    }

    first_id.ok_or_else(|| TransportError::Fatal("no attachment could be sent".into()))
}

//! [`ChannelTransport`] implementation over a `teloxide::Bot`, with every
//! call routed through the shared rate gate and retry policy (§4.1
//! `callTransport`).

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::{
    ApiError, RequestError,
    prelude::*,
    types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId},
};

use chatgate_channels::transport::{ChannelTransport, MessageId as OutMessageId, Result, TransportError};
use chatgate_common::types::{Attachment, AttachmentKind, AttachmentSource, Button, ParseMode};
use chatgate_ratelimit::{bucket::RateLimiter, retry::call_transport};

pub struct BotTransport {
    bot: teloxide::Bot,
    limiter: Arc<RateLimiter>,
}

impl BotTransport {
    #[must_use]
    pub fn new(bot: teloxide::Bot, limiter: Arc<RateLimiter>) -> Self {
        Self { bot, limiter }
    }

    fn chat_id(raw: &str) -> Result<ChatId> {
        raw.parse::<i64>()
            .map(ChatId)
            .map_err(|_| TransportError::Fatal(format!("invalid chat id {raw:?}")))
    }

    fn message_id(raw: &str) -> Result<MessageId> {
        raw.parse::<i32>()
            .map(MessageId)
            .map_err(|_| TransportError::Fatal(format!("invalid message id {raw:?}")))
    }
}

fn to_teloxide_parse_mode(mode: ParseMode) -> Option<teloxide::types::ParseMode> {
    match mode {
        ParseMode::Plain => None,
        ParseMode::Markdown => Some(teloxide::types::ParseMode::Markdown),
        ParseMode::MarkdownV2 => Some(teloxide::types::ParseMode::MarkdownV2),
        ParseMode::Html => Some(teloxide::types::ParseMode::Html),
    }
}

fn to_keyboard(buttons: &[Vec<Button>]) -> InlineKeyboardMarkup {
    let rows = buttons
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| match &b.url {
                    Some(url) => InlineKeyboardButton::url(b.text.clone(), url.parse().unwrap_or_else(|_| {
                        "https://invalid.local".parse().expect("static fallback url parses")
                    })),
                    None => InlineKeyboardButton::callback(b.text.clone(), b.callback_data.clone().unwrap_or_default()),
                })
                .collect::<Vec<_>>()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Map a teloxide error into the transport error taxonomy. "message is not
/// modified" is Telegram's way of saying an edit was a no-op; every other
/// `ApiError` is fatal.
fn map_err(err: RequestError) -> TransportError {
    match &err {
        RequestError::RetryAfter(d) => TransportError::RateLimited { retry_after: Some(*d) },
        RequestError::Api(ApiError::Unknown(msg)) if msg.contains("message is not modified") => {
            TransportError::ContentUnchanged
        },
        _ => TransportError::Fatal(err.to_string()),
    }
}

#[async_trait]
impl ChannelTransport for BotTransport {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: ParseMode,
        buttons: Option<&[Vec<Button>]>,
    ) -> Result<OutMessageId> {
        let chat = Self::chat_id(chat_id)?;
        let result = call_transport(&self.limiter, chat_id, "send_text", || {
            let mut req = self.bot.send_message(chat, text);
            if let Some(mode) = to_teloxide_parse_mode(parse_mode) {
                req = req.parse_mode(mode);
            }
            if let Some(b) = buttons {
                req = req.reply_markup(to_keyboard(b));
            }
            async move { req.await.map_err(map_err) }
        })
        .await?;
        Ok(result.id.0.to_string())
    }

    async fn edit_text(
        &self,
        chat_id: &str,
        message_id: &str,
        text: &str,
        parse_mode: ParseMode,
        buttons: Option<&[Vec<Button>]>,
    ) -> Result<()> {
        let chat = Self::chat_id(chat_id)?;
        let msg_id = Self::message_id(message_id)?;
        match call_transport(&self.limiter, chat_id, "edit_text", || {
            let mut req = self.bot.edit_message_text(chat, msg_id, text);
            if let Some(mode) = to_teloxide_parse_mode(parse_mode) {
                req = req.parse_mode(mode);
            }
            if let Some(b) = buttons {
                req = req.reply_markup(to_keyboard(b));
            }
            async move { req.await.map_err(map_err) }
        })
        .await
        {
            Ok(_) => Ok(()),
            Err(TransportError::ContentUnchanged) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn edit_reply_markup(&self, chat_id: &str, message_id: &str, buttons: Option<&[Vec<Button>]>) -> Result<()> {
        let chat = Self::chat_id(chat_id)?;
        let msg_id = Self::message_id(message_id)?;
        match call_transport(&self.limiter, chat_id, "edit_reply_markup", || {
            let mut req = self.bot.edit_message_reply_markup(chat, msg_id);
            if let Some(b) = buttons {
                req = req.reply_markup(to_keyboard(b));
            }
            async move { req.await.map_err(map_err) }
        })
        .await
        {
            Ok(_) => Ok(()),
            Err(TransportError::ContentUnchanged) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn delete_message(&self, chat_id: &str, message_id: &str) -> Result<()> {
        let chat = Self::chat_id(chat_id)?;
        let msg_id = Self::message_id(message_id)?;
        call_transport(&self.limiter, chat_id, "delete_message", || {
            let req = self.bot.delete_message(chat, msg_id);
            async move { req.await.map_err(map_err) }
        })
        .await?;
        Ok(())
    }

    async fn react_message(&self, chat_id: &str, message_id: &str, emoji: &str) -> Result<()> {
        let chat = Self::chat_id(chat_id)?;
        let msg_id = Self::message_id(message_id)?;
        let reaction = vec![teloxide::types::ReactionType::Emoji { emoji: emoji.to_string() }];
        call_transport(&self.limiter, chat_id, "react_message", || {
            let req = self.bot.set_message_reaction(chat, msg_id).reaction(reaction.clone());
            async move { req.await.map_err(map_err) }
        })
        .await?;
        Ok(())
    }

    async fn send_poll(&self, chat_id: &str, question: &str, options: &[String]) -> Result<OutMessageId> {
        let chat = Self::chat_id(chat_id)?;
        let result = call_transport(&self.limiter, chat_id, "send_poll", || {
            let req = self.bot.send_poll(chat, question, options.iter().cloned());
            async move { req.await.map_err(map_err) }
        })
        .await?;
        Ok(result.id.0.to_string())
    }

    async fn send_attachment(&self, chat_id: &str, attachment: &Attachment, caption: Option<&str>) -> Result<OutMessageId> {
        let chat = Self::chat_id(chat_id)?;
        let input = match &attachment.source {
            AttachmentSource::Url(url) => InputFile::url(
                url.parse()
                    .map_err(|_| TransportError::Fatal(format!("invalid attachment url {url:?}")))?,
            ),
            AttachmentSource::Inline(bytes) => InputFile::memory(bytes.clone()),
        };

        let result = call_transport(&self.limiter, chat_id, "send_attachment", || {
            let input = input.clone();
            let caption = caption.map(str::to_owned);
            async move {
                let sent = match attachment.kind {
                    AttachmentKind::Image | AttachmentKind::Sticker => {
                        let mut req = self.bot.send_photo(chat, input);
                        if let Some(c) = &caption {
                            req = req.caption(c.clone());
                        }
                        req.await
                    },
                    AttachmentKind::Video => {
                        let mut req = self.bot.send_video(chat, input);
                        if let Some(c) = &caption {
                            req = req.caption(c.clone());
                        }
                        req.await
                    },
                    AttachmentKind::Audio => {
                        let mut req = self.bot.send_audio(chat, input);
                        if let Some(c) = &caption {
                            req = req.caption(c.clone());
                        }
                        req.await
                    },
                    AttachmentKind::Voice => {
                        let mut req = self.bot.send_voice(chat, input);
                        if let Some(c) = &caption {
                            req = req.caption(c.clone());
                        }
                        req.await
                    },
                    AttachmentKind::Document => {
                        let mut req = self.bot.send_document(chat, input);
                        if let Some(c) = &caption {
                            req = req.caption(c.clone());
                        }
                        req.await
                    },
                };
                sent.map_err(map_err)
            }
        })
        .await?;
        Ok(result.id.0.to_string())
    }
}

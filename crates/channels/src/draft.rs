//! Draft message streaming (§3 "Outgoing draft stream", §4.1 "Draft
//! streaming contract", invariant I7).
//!
//! A draft stream is a single outgoing message progressively edited in
//! place to approximate token-by-token streaming, while respecting
//! `MIN_UPDATE_INTERVAL` so a fast producer doesn't hammer the transport
//! with an edit per token. Coalescing is implemented with a shared `Mutex`
//! guarding the pending text and timer handle: a new `update`/`append`
//! simply overwrites `pending` and reschedules the timer rather than
//! queuing, so only the latest text is ever flushed.

use std::{sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle, time::Instant};

use crate::transport::{ChannelTransport, MessageId, Result, TransportError};

/// §3 I7: a coalesced update replaces any queued one, and at most one edit
/// lands on the transport per window.
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Suffix appended to the running text while the stream is still open, so
/// the user can tell output is in progress.
const CURSOR_GLYPH: &str = " \u{258C}"; // ▌

struct Inner {
    message_id: Option<MessageId>,
    text: String,
    last_flush: Option<Instant>,
    pending: bool,
    timer: Option<JoinHandle<()>>,
}

/// A single outgoing message edited in place over its lifetime. Born on
/// [`DraftStream::start`], dies on [`DraftStream::finish`] or
/// [`DraftStream::cancel`] — both paths always cancel any pending timer.
pub struct DraftStream {
    transport: Arc<dyn ChannelTransport>,
    chat_id: String,
    inner: Arc<Mutex<Inner>>,
}

impl DraftStream {
    #[must_use]
    pub fn new(transport: Arc<dyn ChannelTransport>, chat_id: impl Into<String>) -> Self {
        Self {
            transport,
            chat_id: chat_id.into(),
            inner: Arc::new(Mutex::new(Inner {
                message_id: None,
                text: String::new(),
                last_flush: None,
                pending: false,
                timer: None,
            })),
        }
    }

    /// Send the initial message (suffixed with the cursor glyph) and record
    /// its id.
    pub async fn start(&self, initial: impl Into<String>) -> Result<MessageId> {
        let mut guard = self.inner.lock().await;
        guard.text = initial.into();
        let id = self
            .transport
            .send_text(
                &self.chat_id,
                &format!("{}{CURSOR_GLYPH}", guard.text),
                Default::default(),
                None,
            )
            .await?;
        guard.message_id = Some(id.clone());
        guard.last_flush = Some(Instant::now());
        Ok(id)
    }

    /// Replace the running text and flush per the coalescing rule.
    pub async fn update(&self, text: impl Into<String>) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.text = text.into();
        self.flush_or_schedule(&mut guard).await
    }

    /// Append to the running text and flush per the coalescing rule.
    pub async fn append(&self, chunk: impl AsRef<str>) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.text.push_str(chunk.as_ref());
        self.flush_or_schedule(&mut guard).await
    }

    async fn flush_or_schedule(&self, guard: &mut Inner) -> Result<()> {
        let Some(message_id) = guard.message_id.clone() else {
            return Ok(());
        };
        let elapsed = guard
            .last_flush
            .map_or(MIN_UPDATE_INTERVAL, |t| t.elapsed());
        if elapsed >= MIN_UPDATE_INTERVAL {
            if let Some(timer) = guard.timer.take() {
                timer.abort();
            }
            guard.pending = false;
            let text = format!("{}{CURSOR_GLYPH}", guard.text);
            self.flush_edit(&self.chat_id, &message_id, &text).await?;
            guard.last_flush = Some(Instant::now());
            return Ok(());
        }

        // Not yet due: coalesce into a single pending flush.
        guard.pending = true;
        if let Some(timer) = guard.timer.take() {
            timer.abort();
        }
        let remaining = MIN_UPDATE_INTERVAL - elapsed;
        let transport = self.transport.clone();
        let chat_id = self.chat_id.clone();
        let inner = self.inner.clone();
        guard.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            let mut guard = inner.lock().await;
            if !guard.pending {
                return;
            }
            guard.pending = false;
            guard.timer = None;
            let Some(message_id) = guard.message_id.clone() else {
                return;
            };
            let text = format!("{}{CURSOR_GLYPH}", guard.text);
            match transport
                .edit_text(&chat_id, &message_id, &text, Default::default(), None)
                .await
            {
                Ok(()) | Err(TransportError::ContentUnchanged) => {
                    guard.last_flush = Some(Instant::now());
                },
                Err(err) => {
                    tracing::warn!(chat_id = %chat_id, error = %err, "draft stream flush failed");
                },
            }
        }));
        Ok(())
    }

    async fn flush_edit(&self, chat_id: &str, message_id: &str, text: &str) -> Result<()> {
        match self
            .transport
            .edit_text(chat_id, message_id, text, Default::default(), None)
            .await
        {
            Ok(()) | Err(TransportError::ContentUnchanged) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Cancel any pending timer and edit to the final text without the
    /// cursor glyph. If `start` was never called, sends a fresh message.
    /// When `final_text` is absent, the last accumulated text is used
    /// as-is (§9 open question (a), decided in `DESIGN.md`).
    pub async fn finish(&self, final_text: Option<String>) -> Result<MessageId> {
        let mut guard = self.inner.lock().await;
        if let Some(timer) = guard.timer.take() {
            timer.abort();
        }
        guard.pending = false;
        if let Some(text) = final_text {
            guard.text = text;
        }
        let final_body = guard.text.clone();

        match guard.message_id.clone() {
            Some(message_id) => {
                match self
                    .transport
                    .edit_text(&self.chat_id, &message_id, &final_body, Default::default(), None)
                    .await
                {
                    Ok(()) | Err(TransportError::ContentUnchanged) => Ok(message_id),
                    Err(err) => Err(err),
                }
            },
            None => {
                let id = self
                    .transport
                    .send_text(&self.chat_id, &final_body, Default::default(), None)
                    .await?;
                guard.message_id = Some(id.clone());
                Ok(id)
            },
        }
    }

    /// Cancel any pending timer and delete the message if one exists.
    pub async fn cancel(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if let Some(timer) = guard.timer.take() {
            timer.abort();
        }
        guard.pending = false;
        if let Some(message_id) = guard.message_id.take() {
            self.transport.delete_message(&self.chat_id, &message_id).await?;
        }
        Ok(())
    }

    pub async fn message_id(&self) -> Option<MessageId> {
        self.inner.lock().await.message_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chatgate_common::types::{Attachment, Button, ParseMode};

    use super::*;

    #[derive(Default)]
    struct MockTransport {
        edits: AtomicUsize,
        sends: AtomicUsize,
    }

    #[async_trait]
    impl ChannelTransport for MockTransport {
        async fn send_text(
            &self,
            _chat_id: &str,
            _text: &str,
            _parse_mode: ParseMode,
            _buttons: Option<&[Vec<Button>]>,
        ) -> Result<MessageId> {
            let n = self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(format!("msg-{n}"))
        }

        async fn edit_text(
            &self,
            _chat_id: &str,
            _message_id: &str,
            _text: &str,
            _parse_mode: ParseMode,
            _buttons: Option<&[Vec<Button>]>,
        ) -> Result<()> {
            self.edits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn edit_reply_markup(
            &self,
            _chat_id: &str,
            _message_id: &str,
            _buttons: Option<&[Vec<Button>]>,
        ) -> Result<()> {
            Ok(())
        }

        async fn delete_message(&self, _chat_id: &str, _message_id: &str) -> Result<()> {
            Ok(())
        }

        async fn react_message(&self, _chat_id: &str, _message_id: &str, _emoji: &str) -> Result<()> {
            Ok(())
        }

        async fn send_poll(&self, _chat_id: &str, _question: &str, _options: &[String]) -> Result<MessageId> {
            Ok("poll-0".into())
        }

        async fn send_attachment(
            &self,
            _chat_id: &str,
            _attachment: &Attachment,
            _caption: Option<&str>,
        ) -> Result<MessageId> {
            Ok("att-0".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_updates_coalesce_into_one_edit() {
        let mock = Arc::new(MockTransport::default());
        let transport: Arc<dyn ChannelTransport> = mock.clone();
        let stream = DraftStream::new(transport, "chat-1");
        stream.start("hello").await.unwrap();

        for i in 0..5 {
            stream.update(format!("hello {i}")).await.unwrap();
            tokio::time::advance(Duration::from_millis(10)).await;
        }

        tokio::time::advance(MIN_UPDATE_INTERVAL + Duration::from_millis(50)).await;
        tokio::task::yield_now().await;

        let edits = mock.edits.load(Ordering::SeqCst);
        assert_eq!(edits, 1, "five rapid updates should coalesce into a single edit");
    }

    #[tokio::test(start_paused = true)]
    async fn finish_without_start_sends_fresh_message() {
        let transport: Arc<dyn ChannelTransport> = Arc::new(MockTransport::default());
        let stream = DraftStream::new(transport, "chat-1");
        let id = stream.finish(Some("done".into())).await.unwrap();
        assert_eq!(id, "msg-0");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_deletes_message_and_clears_id() {
        let transport: Arc<dyn ChannelTransport> = Arc::new(MockTransport::default());
        let stream = DraftStream::new(transport, "chat-1");
        stream.start("hi").await.unwrap();
        stream.cancel().await.unwrap();
        assert_eq!(stream.message_id().await, None);
    }
}

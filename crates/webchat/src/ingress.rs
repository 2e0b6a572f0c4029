//! Ingress chain for an inbound webchat frame — mirrors the bot adapter's
//! `handlers::handle_message` (§4.3 text-input coupling → §4.4 command
//! registry → agent fallback) minus the DM/group access check, since a
//! webchat connection is implicitly trusted.

use std::sync::Arc;

use chatgate_channels::{
    ChannelEventSink, ChannelMessageMeta, ChannelReplyTarget, ChannelTransport,
    message_log::{MessageLog, MessageLogEntry},
    transport::send_outgoing,
};
use chatgate_commands::{CommandContext, CommandRegistry};
use chatgate_common::types::OutgoingMessage;
use chatgate_menu::MenuService;

use crate::frame::ClientFrame;

pub struct IngressDeps {
    pub menu: Arc<MenuService>,
    pub commands: Arc<CommandRegistry>,
}

/// Run one inbound frame through the ingress chain. `account_id`/`chat_id`
/// identify the webchat account and the WS connection; `user_id` is the
/// connection's synthetic identity (there is no external platform user id).
#[allow(clippy::too_many_arguments)]
pub async fn handle_inbound(
    account_id: &str,
    chat_id: &str,
    user_id: &str,
    frame: ClientFrame,
    deps: &IngressDeps,
    transport: &Arc<dyn ChannelTransport>,
    message_log: Option<&Arc<dyn MessageLog>>,
    event_sink: Option<&Arc<dyn ChannelEventSink>>,
) {
    let text = frame.text;

    if let Some(log) = message_log {
        let _ = log
            .log(MessageLogEntry {
                id: 0,
                account_id: account_id.to_string(),
                channel_type: "webchat".to_string(),
                peer_id: user_id.to_string(),
                username: None,
                sender_name: None,
                chat_id: chat_id.to_string(),
                chat_type: "dm".to_string(),
                body: text.clone(),
                access_granted: true,
                created_at: chrono_now_secs(),
            })
            .await;
    }

    if let Some(view) = deps.menu.handle_text_input(user_id, chat_id, &text).await {
        let _ = send_outgoing(
            transport.as_ref(),
            &OutgoingMessage {
                platform: "webchat".to_string(),
                chat_id: chat_id.to_string(),
                text: view.text,
                parse_mode: view.parse_mode,
                buttons: view.buttons,
                attachments: None,
                thread: None,
            },
        )
        .await;
        return;
    }

    let ctx = CommandContext {
        channel: account_id.to_string(),
        user_id: user_id.to_string(),
        chat_id: chat_id.to_string(),
        username: None,
        args: String::new(),
    };
    if let Some(result) = deps.commands.dispatch(&text, ctx).await {
        let reply = result.unwrap_or_else(|e| format!("error: {e}"));
        let _ = transport
            .send_text(chat_id, &reply, chatgate_common::types::ParseMode::Plain, None)
            .await;
        return;
    }

    if let Some(sink) = event_sink {
        sink.dispatch_to_chat(
            &text,
            ChannelReplyTarget { channel_type: "webchat".to_string(), account_id: account_id.to_string(), chat_id: chat_id.to_string() },
            ChannelMessageMeta { channel_type: "webchat".to_string(), sender_name: None, username: None, model: None },
        )
        .await;
    }
}

fn chrono_now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

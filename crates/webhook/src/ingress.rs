//! Ingress chain for an inbound webhook call: command registry first, then
//! the agent collaborator fallback (§4.3). Unlike the bot/webchat adapters
//! there is no menu — a webhook call carries no ongoing chat-UI state to
//! resume.

use std::sync::Arc;

use chatgate_channels::{ChannelEventSink, ChannelMessageMeta, ChannelReplyTarget};
use chatgate_commands::{CommandContext, CommandRegistry};

/// Run one inbound call through the ingress chain. Returns `Some(reply)`
/// when a slash command resolved synchronously; `None` means the call was
/// forwarded to the agent collaborator and the reply (if any) will arrive
/// asynchronously through the account's transport.
pub async fn handle_inbound(
    account_id: &str,
    chat_id: &str,
    text: &str,
    commands: &Arc<CommandRegistry>,
    event_sink: Option<&Arc<dyn ChannelEventSink>>,
) -> Option<String> {
    let ctx = CommandContext {
        channel: account_id.to_string(),
        user_id: chat_id.to_string(),
        chat_id: chat_id.to_string(),
        username: None,
        args: String::new(),
    };
    if let Some(result) = commands.dispatch(text, ctx).await {
        return Some(result.unwrap_or_else(|e| format!("error: {e}")));
    }

    if let Some(sink) = event_sink {
        sink.dispatch_to_chat(
            text,
            ChannelReplyTarget { channel_type: "webhook".to_string(), account_id: account_id.to_string(), chat_id: chat_id.to_string() },
            ChannelMessageMeta { channel_type: "webhook".to_string(), sender_name: None, username: None, model: None },
        )
        .await;
    }
    None
}

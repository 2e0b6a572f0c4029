//! Update handlers: normalize a teloxide update, run access control, and
//! route text through the pending-menu-input → slash-command → agent chain
//! from §4.3.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message, UpdateKind},
};
use tracing::{debug, warn};

use chatgate_channels::{
    ChannelEventSink, ChannelMessageMeta, ChannelReplyTarget, ChannelTransport,
    message_log::{MessageLog, MessageLogEntry},
};
use chatgate_commands::{CommandContext, CommandRegistry};
use chatgate_common::types::ChatType;
use chatgate_menu::MenuService;
use chatgate_pairing::{PairingService, TrustLevel};

use crate::{
    access::{self, AccessDenied},
    config::BotAccountConfig,
    state::AccountStateMap,
};

pub struct HandlerDeps {
    pub pairing: Arc<PairingService>,
    pub menu: Arc<MenuService>,
    pub commands: Arc<CommandRegistry>,
}

pub async fn handle_update(
    update: teloxide::types::Update,
    bot: &Bot,
    account_id: &str,
    accounts: &AccountStateMap,
    deps: &HandlerDeps,
) {
    match update.kind {
        UpdateKind::Message(msg) => {
            if let Err(e) = handle_message(msg, bot, account_id, accounts, deps).await {
                warn!(account_id, error = %e, "error handling message");
            }
        },
        UpdateKind::CallbackQuery(query) => {
            if let Err(e) = handle_callback_query(query, bot, account_id, accounts, deps).await {
                warn!(account_id, error = %e, "error handling callback query");
            }
        },
        other => debug!(account_id, "ignoring unhandled update kind: {other:?}"),
    }
}

fn classify_chat(msg: &Message) -> (ChatType, Option<String>) {
    if msg.chat.is_private() {
        (ChatType::Dm, None)
    } else {
        (ChatType::Group, Some(msg.chat.id.0.to_string()))
    }
}

fn check_bot_mentioned(msg: &Message, bot_username: Option<&str>) -> bool {
    let Some(username) = bot_username else { return false };
    let mention = format!("@{username}");
    msg.text().is_some_and(|t| t.contains(&mention))
        || msg
            .reply_to_message()
            .and_then(|r| r.from.as_ref())
            .is_some_and(|u| u.username.as_deref() == Some(username))
}

async fn handle_message(
    msg: Message,
    bot: &Bot,
    account_id: &str,
    accounts: &AccountStateMap,
    deps: &HandlerDeps,
) -> anyhow::Result<()> {
    let Some(text) = msg.text().map(str::to_string) else {
        debug!(account_id, "ignoring non-text message");
        return Ok(());
    };

    let (config, bot_username, transport, message_log, event_sink, warnings, admin_cache) = {
        let accts = accounts.read().unwrap_or_else(|e| e.into_inner());
        let Some(state) = accts.get(account_id) else {
            warn!(account_id, "handler: account not found in state map");
            return Ok(());
        };
        (
            state.config.clone(),
            state.bot_username.clone(),
            Arc::clone(&state.transport),
            state.message_log.clone(),
            state.event_sink.clone(),
            state.warnings.clone(),
            state.admin_cache.clone(),
        )
    };

    let (chat_type, group_id) = classify_chat(&msg);
    let chat_id = msg.chat.id.0.to_string();
    let peer_id = msg.from.as_ref().map(|u| u.id.0.to_string()).unwrap_or_default();
    let username = msg.from.as_ref().and_then(|u| u.username.clone());
    let bot_mentioned = check_bot_mentioned(&msg, bot_username.as_deref());

    if matches!(chat_type, ChatType::Group) {
        if let Some(gid) = &group_id
            && admin_cache.get(gid).is_none()
        {
            let is_admin = check_is_admin(bot, msg.chat.id).await;
            admin_cache.set(gid, is_admin);
            if !is_admin && warnings.should_warn(gid, std::time::Duration::from_secs(config.admin_warning_cooldown_secs)) {
                let _ = transport
                    .send_text(
                        &chat_id,
                        "I need to be an admin in this group to read messages reliably.",
                        chatgate_common::types::ParseMode::Plain,
                        None,
                    )
                    .await;
            }
        }
    }

    let trust = deps.pairing.trust_level(account_id, &peer_id).await.unwrap_or(TrustLevel::Stranger);

    let access_result = access::check_access(
        &config,
        &chat_type,
        &peer_id,
        username.as_deref(),
        group_id.as_deref(),
        bot_mentioned,
        trust,
    );

    if let Some(log) = &message_log {
        let chat_type_str = match chat_type {
            ChatType::Dm => "dm",
            ChatType::Group => "group",
        };
        let _ = log
            .log(MessageLogEntry {
                id: 0,
                account_id: account_id.into(),
                channel_type: "bot".into(),
                peer_id: peer_id.clone(),
                username: username.clone(),
                sender_name: msg.from.as_ref().and_then(|u| {
                    let name = format!("{} {}", u.first_name, u.last_name.as_deref().unwrap_or("")).trim().to_string();
                    if name.is_empty() { None } else { Some(name) }
                }),
                chat_id: chat_id.clone(),
                chat_type: chat_type_str.into(),
                body: text.clone(),
                access_granted: access_result.is_ok(),
                created_at: chrono::Utc::now().timestamp(),
            })
            .await;
    }

    match access_result {
        Ok(()) => {},
        Err(AccessDenied::NeedsPairing) => {
            if let Ok(Some(code)) = deps.pairing.create_pairing_request(account_id, &peer_id, username.as_deref()).await {
                let _ = transport
                    .send_text(
                        &chat_id,
                        &format!("You're not paired yet. Send this code to an owner to approve: {code}"),
                        chatgate_common::types::ParseMode::Plain,
                        None,
                    )
                    .await;
            }
            return Ok(());
        },
        Err(_) => return Ok(()),
    }

    if let Some(view) = deps.menu.handle_text_input(&peer_id, &chat_id, &text).await {
        let _ = chatgate_channels::transport::send_outgoing(
            transport.as_ref(),
            &chatgate_common::types::OutgoingMessage {
                chat_id: chat_id.clone(),
                text: view.text,
                parse_mode: view.parse_mode,
                buttons: view.buttons,
                attachments: None,
            },
        )
        .await;
        return Ok(());
    }

    let ctx = CommandContext {
        channel: account_id.to_string(),
        user_id: peer_id.clone(),
        chat_id: chat_id.clone(),
        username: username.clone(),
        args: String::new(),
    };
    if let Some(result) = deps.commands.dispatch(&text, ctx).await {
        let reply = result.unwrap_or_else(|e| format!("error: {e}"));
        let _ = transport
            .send_text(&chat_id, &reply, chatgate_common::types::ParseMode::Plain, None)
            .await;
        return Ok(());
    }

    if let Some(sink) = &event_sink {
        sink.dispatch_to_chat(
            &text,
            ChannelReplyTarget { channel_type: "bot".into(), account_id: account_id.into(), chat_id },
            ChannelMessageMeta { channel_type: "bot".into(), sender_name: username.clone(), username, model: None },
        )
        .await;
    }

    Ok(())
}

async fn handle_callback_query(
    query: CallbackQuery,
    bot: &Bot,
    account_id: &str,
    accounts: &AccountStateMap,
    deps: &HandlerDeps,
) -> anyhow::Result<()> {
    let Some(data) = query.data.clone() else { return Ok(()) };
    let Some(msg) = query.message.as_ref() else { return Ok(()) };

    bot.answer_callback_query(query.id.clone()).await.ok();

    let chat_id = msg.chat().id.0.to_string();
    let user_id = query.from.id.0.to_string();

    let view = deps.menu.handle_callback(&user_id, &chat_id, &data).await;

    let transport = {
        let accts = accounts.read().unwrap_or_else(|e| e.into_inner());
        accts.get(account_id).map(|s| Arc::clone(&s.transport))
    };
    if let Some(transport) = transport {
        if !view.text.is_empty() {
            transport
                .edit_text(&chat_id, &msg.id().0.to_string(), &view.text, view.parse_mode, view.buttons.as_deref())
                .await
                .ok();
        }
    }

    Ok(())
}

async fn check_is_admin(bot: &Bot, chat_id: teloxide::types::ChatId) -> bool {
    let me = match bot.get_me().await {
        Ok(me) => me,
        Err(_) => return false,
    };
    match bot.get_chat_member(chat_id, me.id).await {
        Ok(member) => member.is_privileged(),
        Err(_) => false,
    }
}

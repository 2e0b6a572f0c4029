//! Long-polling loop for a single bot account.

use std::sync::Arc;

use secrecy::ExposeSecret;
use teloxide::{ApiError, RequestError, prelude::*, types::AllowedUpdate};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chatgate_channels::{ChannelEventSink, message_log::MessageLog};
use chatgate_ratelimit::bucket::{RateLimiter, RateLimiterConfig};

use crate::{
    config::BotAccountConfig,
    handlers::{self, HandlerDeps},
    state::{AccountState, AccountStateMap, AdminWarningTracker, GroupAdminCache},
    transport::BotTransport,
};

/// Start polling for a single bot account. Spawns a background task that
/// runs until the returned token is cancelled.
pub async fn start_polling(
    account_id: String,
    config: BotAccountConfig,
    accounts: AccountStateMap,
    message_log: Option<Arc<dyn MessageLog>>,
    event_sink: Option<Arc<dyn ChannelEventSink>>,
    deps: Arc<HandlerDeps>,
) -> anyhow::Result<CancellationToken> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(std::time::Duration::from_secs(45))
        .build()?;
    let bot = teloxide::Bot::with_client(config.token.expose_secret(), client);

    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    bot.delete_webhook().send().await?;

    info!(account_id, username = ?bot_username, "bot connected, webhook cleared");

    let cancel = CancellationToken::new();
    let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::default()));
    let transport = Arc::new(BotTransport::new(bot.clone(), limiter));

    let state = AccountState {
        bot: bot.clone(),
        bot_username,
        account_id: account_id.clone(),
        config,
        transport,
        cancel: cancel.clone(),
        message_log,
        event_sink,
        admin_cache: GroupAdminCache::new(),
        warnings: AdminWarningTracker::new(),
    };

    {
        let mut map = accounts.write().unwrap_or_else(|e| e.into_inner());
        map.insert(account_id.clone(), state);
    }

    let cancel_clone = cancel.clone();
    let aid = account_id.clone();
    let poll_accounts = Arc::clone(&accounts);
    tokio::spawn(async move {
        info!(account_id = aid, "starting polling loop");
        let mut offset: i32 = 0;

        loop {
            if cancel_clone.is_cancelled() {
                info!(account_id = aid, "polling stopped");
                break;
            }

            let result = bot
                .get_updates()
                .offset(offset)
                .timeout(30)
                .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery])
                .await;

            match result {
                Ok(updates) => {
                    debug!(account_id = aid, count = updates.len(), "got updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        handlers::handle_update(update, &bot, &aid, &poll_accounts, &deps).await;
                    }
                },
                Err(e) => {
                    let is_conflict = matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates));
                    if is_conflict {
                        warn!(account_id = aid, "bot disabled: another instance is running with this token");
                        let sink = {
                            let accts = poll_accounts.read().unwrap_or_else(|e| e.into_inner());
                            accts.get(&aid).and_then(|s| s.event_sink.clone())
                        };
                        if let Some(sink) = sink {
                            sink.request_disable_account("bot", &aid, "another bot instance is already running with this token")
                                .await;
                        }
                        cancel_clone.cancel();
                        break;
                    }
                    warn!(account_id = aid, error = %e, "get_updates failed");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                },
            }
        }
    });

    Ok(cancel)
}

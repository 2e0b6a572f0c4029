//! [`ChannelPlugin`] implementation for the bot adapter.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Instant,
};

use async_trait::async_trait;
use secrecy::ExposeSecret;
use teloxide::prelude::Requester;
use tracing::{info, warn};

use chatgate_channels::{
    ChannelEventSink, ChannelHealthSnapshot, ChannelPlugin, ChannelStatus, ChannelTransport,
    message_log::MessageLog,
};
use chatgate_commands::CommandRegistry;
use chatgate_menu::MenuService;
use chatgate_pairing::PairingService;

use crate::{bot, config::BotAccountConfig, handlers::HandlerDeps, state::AccountStateMap};

const PROBE_CACHE_TTL: std::time::Duration = std::time::Duration::from_secs(30);

/// Channel plugin for the Telegram-style bot adapter (§4.1, adapter E).
pub struct BotPlugin {
    accounts: AccountStateMap,
    message_log: Option<Arc<dyn MessageLog>>,
    event_sink: Option<Arc<dyn ChannelEventSink>>,
    deps: Arc<HandlerDeps>,
    probe_cache: RwLock<HashMap<String, (ChannelHealthSnapshot, Instant)>>,
}

impl BotPlugin {
    #[must_use]
    pub fn new(pairing: Arc<PairingService>, menu: Arc<MenuService>, commands: Arc<CommandRegistry>) -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            message_log: None,
            event_sink: None,
            deps: Arc::new(HandlerDeps { pairing, menu, commands }),
            probe_cache: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_message_log(mut self, log: Arc<dyn MessageLog>) -> Self {
        self.message_log = Some(log);
        self
    }

    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn ChannelEventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    #[must_use]
    pub fn account_ids(&self) -> Vec<String> {
        self.accounts.read().unwrap_or_else(|e| e.into_inner()).keys().cloned().collect()
    }

    /// Update an account's config in place without restarting the polling
    /// loop, e.g. when a pairing approval widens the allowlist.
    pub fn update_account_config(&self, account_id: &str, config: serde_json::Value) -> anyhow::Result<()> {
        let parsed: BotAccountConfig = serde_json::from_value(config)?;
        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        match accounts.get_mut(account_id) {
            Some(state) => {
                state.config = parsed;
                Ok(())
            },
            None => Err(anyhow::anyhow!("account not found: {account_id}")),
        }
    }
}

#[async_trait]
impl ChannelPlugin for BotPlugin {
    fn id(&self) -> &str {
        "bot"
    }

    fn name(&self) -> &str {
        "Bot"
    }

    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> anyhow::Result<()> {
        let parsed: BotAccountConfig = serde_json::from_value(config)?;
        if parsed.token.expose_secret().is_empty() {
            return Err(anyhow::anyhow!("bot token is required"));
        }

        info!(account_id, "starting bot account");
        bot::start_polling(
            account_id.to_string(),
            parsed,
            Arc::clone(&self.accounts),
            self.message_log.clone(),
            self.event_sink.clone(),
            Arc::clone(&self.deps),
        )
        .await?;

        Ok(())
    }

    async fn stop_account(&mut self, account_id: &str) -> anyhow::Result<()> {
        let cancel = {
            let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
            accounts.get(account_id).map(|s| s.cancel.clone())
        };
        match cancel {
            Some(cancel) => {
                info!(account_id, "stopping bot account");
                cancel.cancel();
                self.accounts.write().unwrap_or_else(|e| e.into_inner()).remove(account_id);
            },
            None => warn!(account_id, "bot account not found"),
        }
        Ok(())
    }

    fn outbound(&self, account_id: &str) -> Option<Arc<dyn ChannelTransport>> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts.get(account_id).map(|s| Arc::clone(&s.transport))
    }

    fn status(&self) -> Option<&dyn ChannelStatus> {
        Some(self)
    }
}

#[async_trait]
impl ChannelStatus for BotPlugin {
    async fn probe(&self, account_id: &str) -> anyhow::Result<ChannelHealthSnapshot> {
        if let Ok(cache) = self.probe_cache.read()
            && let Some((snap, ts)) = cache.get(account_id)
            && ts.elapsed() < PROBE_CACHE_TTL
        {
            return Ok(snap.clone());
        }

        let bot = {
            let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
            accounts.get(account_id).map(|s| s.bot.clone())
        };

        let result = match bot {
            Some(bot) => match bot.get_me().await {
                Ok(me) => ChannelHealthSnapshot {
                    connected: true,
                    account_id: account_id.to_string(),
                    details: Some(format!("Bot: @{}", me.username.as_deref().unwrap_or("unknown"))),
                },
                Err(e) => ChannelHealthSnapshot { connected: false, account_id: account_id.to_string(), details: Some(format!("API error: {e}")) },
            },
            None => ChannelHealthSnapshot { connected: false, account_id: account_id.to_string(), details: Some("account not started".into()) },
        };

        if let Ok(mut cache) = self.probe_cache.write() {
            cache.insert(account_id.to_string(), (result.clone(), Instant::now()));
        }

        Ok(result)
    }
}

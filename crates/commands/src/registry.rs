//! The command registry consulted at ingress step 3 (§4.4): `/cmd args`
//! tokens are matched against a closed set of built-in handlers before the
//! message falls through to the agent collaborator.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chatgate_menu::MenuService;
use chatgate_pairing::{PairingService, TrustLevel};

use crate::error::Result;

/// Everything a handler needs to know about the sender and the rest of the
/// command line after the command word.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub channel: String,
    pub user_id: String,
    pub chat_id: String,
    pub username: Option<String>,
    pub args: String,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// The command word, without the leading slash (e.g. `"start"`).
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &CommandContext) -> Result<String>;
}

/// Owns the built-in handlers plus whatever an embedder registers. Cheap to
/// clone: handlers are reference-counted.
#[derive(Clone)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// Construct with the built-in handlers (`start`, `new`, `help`,
    /// `approve`, `reject`, `wallet`) wired to the given services.
    #[must_use]
    pub fn new(pairing: PairingService, menu: MenuService) -> Self {
        let mut registry = Self { handlers: HashMap::new() };
        registry.register(Arc::new(StartCommand { pairing: pairing.clone(), menu: menu.clone() }));
        registry.register(Arc::new(NewCommand { menu: menu.clone() }));
        registry.register(Arc::new(HelpCommand));
        registry.register(Arc::new(ApproveCommand { pairing: pairing.clone() }));
        registry.register(Arc::new(RejectCommand { pairing: pairing.clone() }));
        registry.register(Arc::new(WalletCommand { pairing }));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    /// Parse `raw` as `/cmd args`; `None` if it isn't a recognized command,
    /// signaling the caller to forward the message to the agent.
    pub async fn dispatch(&self, raw: &str, mut ctx: CommandContext) -> Option<Result<String>> {
        let trimmed = raw.trim();
        let rest = trimmed.strip_prefix('/')?;
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or("");
        let args = parts.next().unwrap_or("").trim().to_string();
        let handler = self.handlers.get(name)?.clone();
        ctx.args = args;
        Some(handler.run(&ctx).await)
    }
}

struct StartCommand {
    pairing: PairingService,
    menu: MenuService,
}

#[async_trait]
impl CommandHandler for StartCommand {
    fn name(&self) -> &'static str {
        "start"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<String> {
        self.menu.clear_state(&ctx.user_id).await;

        if ctx.args.is_empty() {
            return Ok("Welcome! Use the menu below to get started.".to_string());
        }

        match self.pairing.validate_code(&ctx.args).await? {
            Some(_) => Ok("You're paired. Send a message to get started.".to_string()),
            None => Ok("That pairing code is invalid or has expired.".to_string()),
        }
    }
}

struct NewCommand {
    menu: MenuService,
}

#[async_trait]
impl CommandHandler for NewCommand {
    fn name(&self) -> &'static str {
        "new"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<String> {
        self.menu.clear_state(&ctx.user_id).await;
        Ok("Started a fresh session.".to_string())
    }
}

struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    async fn run(&self, _ctx: &CommandContext) -> Result<String> {
        Ok("\
Commands:
/start [code] - begin, optionally consuming a pairing code
/new - clear the current menu session
/approve <code> - (owner) approve a pending pairing request
/reject <code> - (owner) reject a pending pairing request
/wallet - show the wallet linked to this chat"
            .to_string())
    }
}

struct ApproveCommand {
    pairing: PairingService,
}

#[async_trait]
impl CommandHandler for ApproveCommand {
    fn name(&self) -> &'static str {
        "approve"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<String> {
        require_owner(&self.pairing, ctx).await?;
        if ctx.args.is_empty() {
            return Ok("Usage: /approve <code>".to_string());
        }
        match self.pairing.approve_request(&ctx.channel, &ctx.args).await {
            Ok(request) => Ok(format!("Approved pairing for user {}.", request.user_id)),
            Err(chatgate_pairing::Error::NotFound) => Ok("No pending request with that code.".to_string()),
            Err(other) => Err(other.into()),
        }
    }
}

struct RejectCommand {
    pairing: PairingService,
}

#[async_trait]
impl CommandHandler for RejectCommand {
    fn name(&self) -> &'static str {
        "reject"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<String> {
        require_owner(&self.pairing, ctx).await?;
        if ctx.args.is_empty() {
            return Ok("Usage: /reject <code>".to_string());
        }
        match self.pairing.reject_request(&ctx.channel, &ctx.args).await {
            Ok(()) => Ok("Rejected.".to_string()),
            Err(chatgate_pairing::Error::NotFound) => Ok("No pending request with that code.".to_string()),
            Err(other) => Err(other.into()),
        }
    }
}

struct WalletCommand {
    pairing: PairingService,
}

#[async_trait]
impl CommandHandler for WalletCommand {
    fn name(&self) -> &'static str {
        "wallet"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<String> {
        match self.pairing.get_wallet_for_chat_user(&ctx.channel, &ctx.user_id).await? {
            Some(wallet) => Ok(format!("Linked wallet: {wallet}")),
            None => Ok("No wallet linked yet. Use the Wallet menu to link one.".to_string()),
        }
    }
}

async fn require_owner(pairing: &PairingService, ctx: &CommandContext) -> Result<()> {
    let level = pairing.trust_level(&ctx.channel, &ctx.user_id).await?;
    if level < TrustLevel::Owner {
        return Err(chatgate_pairing::Error::NotFound.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chatgate_store::Store;

    use super::*;

    async fn registry() -> CommandRegistry {
        let store = Store::in_memory().await.unwrap();
        let pairing = PairingService::new(store);
        let menu = MenuService::new(Arc::new(NullFeed), Arc::new(NullExecution), Arc::new(NullCredentials), Arc::new(NullCopyTrading));
        CommandRegistry::new(pairing, menu)
    }

    fn ctx(args: &str) -> CommandContext {
        CommandContext {
            channel: "telegram".to_string(),
            user_id: "u1".to_string(),
            chat_id: "c1".to_string(),
            username: None,
            args: args.to_string(),
        }
    }

    struct NullFeed;
    #[async_trait]
    impl chatgate_common::collaborators::FeedManager for NullFeed {
        async fn get_market(&self, _id: &str, _platform: &str) -> anyhow::Result<Option<chatgate_common::collaborators::Market>> {
            Ok(None)
        }
        async fn search_markets(&self, _query: &str, _platform: &str) -> anyhow::Result<Vec<chatgate_common::collaborators::Market>> {
            Ok(Vec::new())
        }
    }

    struct NullExecution;
    #[async_trait]
    impl chatgate_common::collaborators::ExecutionService for NullExecution {
        async fn market_buy(&self, _platform: &str, _token_id: &str, _size_usd: f64) -> anyhow::Result<chatgate_common::collaborators::ExecutionResult> {
            Ok(chatgate_common::collaborators::ExecutionResult::failure("unimplemented"))
        }
        async fn market_sell(&self, _platform: &str, _token_id: &str, _size_usd: f64) -> anyhow::Result<chatgate_common::collaborators::ExecutionResult> {
            Ok(chatgate_common::collaborators::ExecutionResult::failure("unimplemented"))
        }
        async fn buy_limit(&self, _platform: &str, _token_id: &str, _size_usd: f64, _price: f64) -> anyhow::Result<chatgate_common::collaborators::ExecutionResult> {
            Ok(chatgate_common::collaborators::ExecutionResult::failure("unimplemented"))
        }
        async fn sell_limit(&self, _platform: &str, _token_id: &str, _size_usd: f64, _price: f64) -> anyhow::Result<chatgate_common::collaborators::ExecutionResult> {
            Ok(chatgate_common::collaborators::ExecutionResult::failure("unimplemented"))
        }
        async fn get_open_orders(&self, _platform: &str) -> anyhow::Result<Vec<chatgate_common::collaborators::OpenOrder>> {
            Ok(Vec::new())
        }
        async fn cancel_order(&self, _platform: &str, _order_id: &str) -> anyhow::Result<chatgate_common::collaborators::ExecutionResult> {
            Ok(chatgate_common::collaborators::ExecutionResult::failure("unimplemented"))
        }
        async fn cancel_all_orders(&self, _platform: &str) -> anyhow::Result<chatgate_common::collaborators::ExecutionResult> {
            Ok(chatgate_common::collaborators::ExecutionResult::failure("unimplemented"))
        }
    }

    struct NullCredentials;
    #[async_trait]
    impl chatgate_common::collaborators::CredentialsManager for NullCredentials {
        async fn has_credentials(&self, _wallet: &str, _platform: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
        async fn set_credentials(&self, _wallet: &str, _platform: &str, _payload: serde_json::Value) -> anyhow::Result<()> {
            Ok(())
        }
        async fn delete_credentials(&self, _wallet: &str, _platform: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn mark_success(&self, _wallet: &str, _platform: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn mark_failure(&self, _wallet: &str, _platform: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn is_in_cooldown(&self, _wallet: &str, _platform: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
        async fn list_user_platforms(&self, _wallet: &str) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct NullCopyTrading;
    #[async_trait]
    impl chatgate_common::collaborators::CopyTradingOrchestrator for NullCopyTrading {
        async fn initialize(&self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn shutdown(&self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn list_configs(&self, _owner_wallet: &str) -> anyhow::Result<Vec<serde_json::Value>> {
            Ok(Vec::new())
        }
        async fn create_config(&self, _owner_wallet: &str, _config: serde_json::Value) -> anyhow::Result<String> {
            Ok(String::new())
        }
        async fn update_config(&self, _config_id: &str, _config: serde_json::Value) -> anyhow::Result<()> {
            Ok(())
        }
        async fn delete_config(&self, _config_id: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn toggle_config(&self, _config_id: &str, _enabled: bool) -> anyhow::Result<()> {
            Ok(())
        }
        async fn get_history(&self, _config_id: &str) -> anyhow::Result<Vec<serde_json::Value>> {
            Ok(Vec::new())
        }
        async fn get_aggregated_stats(&self, _owner_wallet: &str) -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::json!({}))
        }
    }

    #[tokio::test]
    async fn non_command_text_returns_none() {
        let reg = registry().await;
        assert!(reg.dispatch("hello there", ctx("")).await.is_none());
    }

    #[tokio::test]
    async fn start_with_valid_code_pairs_the_user() {
        let store = Store::in_memory().await.unwrap();
        let pairing = PairingService::new(store);
        let code = pairing.create_pairing_request("telegram", "u1", None).await.unwrap().unwrap();
        let menu = MenuService::new(Arc::new(NullFeed), Arc::new(NullExecution), Arc::new(NullCredentials), Arc::new(NullCopyTrading));
        let reg = CommandRegistry::new(pairing, menu);

        let reply = reg.dispatch(&format!("/start {code}"), ctx("")).await.unwrap().unwrap();
        assert!(reply.contains("paired"));
    }

    #[tokio::test]
    async fn approve_requires_owner_trust() {
        let reg = registry().await;
        let reply = reg.dispatch("/approve ABCD1234", ctx("")).await.unwrap();
        assert!(reply.is_err());
    }

    #[tokio::test]
    async fn unknown_command_falls_through() {
        let reg = registry().await;
        assert!(reg.dispatch("/frobnicate", ctx("")).await.is_none());
    }
}

//! Default stub implementations of the five external collaborator traits
//! (§6.2), generalizing the `NullFeed`/`NullExecution` test doubles in
//! `chatgate-commands`' registry tests. Every one of these traits is a
//! non-goal of this crate — no market feed, execution venue, LLM agent,
//! credentials vault, or copy-trading engine is implemented here — but the
//! gateway must still boot and answer requests end to end without a real
//! backend wired in, so it constructs these by default and lets an
//! embedder swap in real implementations before calling [`crate::boot::boot`].

use std::sync::Arc;

use async_trait::async_trait;
use chatgate_common::collaborators::{
    AgentManager, CopyTradingOrchestrator, CredentialsManager, ExecutionResult, ExecutionService,
    FeedManager, Market, OpenOrder,
};

/// Reports no markets and performs no lookups. Search/market menu entries
/// render as empty until a real feed is wired in.
pub struct NullFeedManager;

#[async_trait]
impl FeedManager for NullFeedManager {
    async fn get_market(&self, _id: &str, _platform: &str) -> anyhow::Result<Option<Market>> {
        Ok(None)
    }

    async fn search_markets(&self, _query: &str, _platform: &str) -> anyhow::Result<Vec<Market>> {
        Ok(Vec::new())
    }
}

/// Fails every order/cancel call with a descriptive error rather than
/// silently pretending to trade.
pub struct NullExecutionService;

#[async_trait]
impl ExecutionService for NullExecutionService {
    async fn market_buy(&self, _platform: &str, _token_id: &str, _size_usd: f64) -> anyhow::Result<ExecutionResult> {
        Ok(ExecutionResult::failure("no execution service configured"))
    }

    async fn market_sell(&self, _platform: &str, _token_id: &str, _size_usd: f64) -> anyhow::Result<ExecutionResult> {
        Ok(ExecutionResult::failure("no execution service configured"))
    }

    async fn buy_limit(&self, _platform: &str, _token_id: &str, _size_usd: f64, _price: f64) -> anyhow::Result<ExecutionResult> {
        Ok(ExecutionResult::failure("no execution service configured"))
    }

    async fn sell_limit(&self, _platform: &str, _token_id: &str, _size_usd: f64, _price: f64) -> anyhow::Result<ExecutionResult> {
        Ok(ExecutionResult::failure("no execution service configured"))
    }

    async fn get_open_orders(&self, _platform: &str) -> anyhow::Result<Vec<OpenOrder>> {
        Ok(Vec::new())
    }

    async fn cancel_order(&self, _platform: &str, _order_id: &str) -> anyhow::Result<ExecutionResult> {
        Ok(ExecutionResult::failure("no execution service configured"))
    }

    async fn cancel_all_orders(&self, _platform: &str) -> anyhow::Result<ExecutionResult> {
        Ok(ExecutionResult::failure("no execution service configured"))
    }
}

/// Echoes a fixed reply so ingress (§4.4 step 4) has something observable
/// to forward to even without a real agent. Config/skill reloads are no-ops.
pub struct NullAgentManager;

#[async_trait]
impl AgentManager for NullAgentManager {
    async fn handle_message(&self, _message: &str, _session: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn reload_config(&self, _config: serde_json::Value) -> anyhow::Result<()> {
        Ok(())
    }

    async fn reload_skills(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn dispose(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Reports no stored credentials and rejects every mutation; copy-trading
/// wizard steps that depend on credentials degrade to "not configured"
/// rather than panicking.
pub struct NullCredentialsManager;

#[async_trait]
impl CredentialsManager for NullCredentialsManager {
    async fn has_credentials(&self, _wallet: &str, _platform: &str) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn set_credentials(&self, _wallet: &str, _platform: &str, _payload: serde_json::Value) -> anyhow::Result<()> {
        anyhow::bail!("no credentials manager configured")
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

/// Reports an empty config set and refuses to create new ones. The
/// wallet-scoped `/api/v1/copy-trading/*` routes (§6.3) stay reachable and
/// return `UNAVAILABLE` rather than the router 404ing outright.
pub struct NullCopyTradingOrchestrator;

#[async_trait]
impl CopyTradingOrchestrator for NullCopyTradingOrchestrator {
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
        anyhow::bail!("no copy-trading orchestrator configured")
    }

    async fn update_config(&self, _config_id: &str, _config: serde_json::Value) -> anyhow::Result<()> {
        anyhow::bail!("no copy-trading orchestrator configured")
    }

    async fn delete_config(&self, _config_id: &str) -> anyhow::Result<()> {
        anyhow::bail!("no copy-trading orchestrator configured")
    }

    async fn toggle_config(&self, _config_id: &str, _enabled: bool) -> anyhow::Result<()> {
        anyhow::bail!("no copy-trading orchestrator configured")
    }

    async fn get_history(&self, _config_id: &str) -> anyhow::Result<Vec<serde_json::Value>> {
        Ok(Vec::new())
    }

    async fn get_aggregated_stats(&self, _owner_wallet: &str) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::json!({}))
    }
}

/// Bundles the five collaborator handles the gateway threads through
/// construction. `GatewayBuilder::with_*` overrides individual fields;
/// anything left unset falls back to the corresponding `Null*` stub.
#[derive(Clone)]
pub struct Collaborators {
    pub feed: Arc<dyn FeedManager>,
    pub execution: Arc<dyn ExecutionService>,
    pub agent: Arc<dyn AgentManager>,
    pub credentials: Arc<dyn CredentialsManager>,
    pub copy_trading: Arc<dyn CopyTradingOrchestrator>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            feed: Arc::new(NullFeedManager),
            execution: Arc::new(NullExecutionService),
            agent: Arc::new(NullAgentManager),
            credentials: Arc::new(NullCredentialsManager),
            copy_trading: Arc::new(NullCopyTradingOrchestrator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_agent_has_no_opinion() {
        let agent = NullAgentManager;
        assert_eq!(agent.handle_message("hi", "s1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn null_execution_reports_failure_not_panic() {
        let exec = NullExecutionService;
        let result = exec.market_buy("polymarket", "tok1", 10.0).await.unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn null_feed_has_no_markets() {
        let feed = NullFeedManager;
        assert!(feed.get_market("m1", "polymarket").await.unwrap().is_none());
        assert!(feed.search_markets("anything", "polymarket").await.unwrap().is_empty());
    }
}

//! Trait-only interfaces for the core's back-end collaborators (§6.2): the
//! market-data feed, the execution service, the LLM agent, the credentials
//! manager, and the copy-trading orchestrator. None of these are
//! implemented here — the core only ever consumes them through these
//! traits, so a concrete implementation can be swapped or stubbed without
//! touching the adapters, menu, or gateway code that depends on it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tradeable market as the core sees it. Fields beyond what the menu and
/// wizard flow need are deliberately omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub platform: String,
    pub title: String,
    pub last_price: Option<f64>,
}

/// `ExecutionService` result shape (§6.2: "Results carry `{success,
/// orderId?, status?, avgFillPrice?, filledSize?, error?}`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub order_id: Option<String>,
    pub status: Option<String>,
    pub avg_fill_price: Option<f64>,
    pub filled_size: Option<f64>,
    pub error: Option<String>,
}

impl ExecutionResult {
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            order_id: None,
            status: None,
            avg_fill_price: None,
            filled_size: None,
            error: Some(error.into()),
        }
    }
}

/// Read-only market data. "Core only reads" (§6.2).
#[async_trait]
pub trait FeedManager: Send + Sync {
    async fn get_market(&self, id: &str, platform: &str) -> anyhow::Result<Option<Market>>;
    async fn search_markets(&self, query: &str, platform: &str) -> anyhow::Result<Vec<Market>>;
}

/// Order placement and management against a trading venue.
#[async_trait]
pub trait ExecutionService: Send + Sync {
    async fn market_buy(&self, platform: &str, token_id: &str, size_usd: f64) -> anyhow::Result<ExecutionResult>;
    async fn market_sell(&self, platform: &str, token_id: &str, size_usd: f64) -> anyhow::Result<ExecutionResult>;
    async fn buy_limit(
        &self,
        platform: &str,
        token_id: &str,
        size_usd: f64,
        price: f64,
    ) -> anyhow::Result<ExecutionResult>;
    async fn sell_limit(
        &self,
        platform: &str,
        token_id: &str,
        size_usd: f64,
        price: f64,
    ) -> anyhow::Result<ExecutionResult>;
    async fn get_open_orders(&self, platform: &str) -> anyhow::Result<Vec<OpenOrder>>;
    async fn cancel_order(&self, platform: &str, order_id: &str) -> anyhow::Result<ExecutionResult>;
    async fn cancel_all_orders(&self, platform: &str) -> anyhow::Result<ExecutionResult>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: String,
    pub token_id: String,
    pub side: String,
    pub size: f64,
    pub price: Option<f64>,
}

/// The LLM agent the core forwards non-command, non-menu text to (§4.4
/// "Ingress callback").
#[async_trait]
pub trait AgentManager: Send + Sync {
    async fn handle_message(&self, message: &str, session: &str) -> anyhow::Result<Option<String>>;
    async fn reload_config(&self, config: serde_json::Value) -> anyhow::Result<()>;
    async fn reload_skills(&self) -> anyhow::Result<()>;
    async fn dispose(&self) -> anyhow::Result<()>;
}

/// Per-wallet, per-platform trading credentials.
#[async_trait]
pub trait CredentialsManager: Send + Sync {
    async fn has_credentials(&self, wallet: &str, platform: &str) -> anyhow::Result<bool>;
    async fn set_credentials(&self, wallet: &str, platform: &str, payload: serde_json::Value) -> anyhow::Result<()>;
    async fn delete_credentials(&self, wallet: &str, platform: &str) -> anyhow::Result<()>;
    async fn mark_success(&self, wallet: &str, platform: &str) -> anyhow::Result<()>;
    async fn mark_failure(&self, wallet: &str, platform: &str) -> anyhow::Result<()>;
    async fn is_in_cooldown(&self, wallet: &str, platform: &str) -> anyhow::Result<bool>;
    async fn list_user_platforms(&self, wallet: &str) -> anyhow::Result<Vec<String>>;
}

/// Copy-trading configuration lifecycle (§6.2).
#[async_trait]
pub trait CopyTradingOrchestrator: Send + Sync {
    async fn initialize(&self) -> anyhow::Result<()>;
    async fn shutdown(&self) -> anyhow::Result<()>;
    async fn list_configs(&self, owner_wallet: &str) -> anyhow::Result<Vec<serde_json::Value>>;
    async fn create_config(&self, owner_wallet: &str, config: serde_json::Value) -> anyhow::Result<String>;
    async fn update_config(&self, config_id: &str, config: serde_json::Value) -> anyhow::Result<()>;
    async fn delete_config(&self, config_id: &str) -> anyhow::Result<()>;
    async fn toggle_config(&self, config_id: &str, enabled: bool) -> anyhow::Result<()>;
    async fn get_history(&self, config_id: &str) -> anyhow::Result<Vec<serde_json::Value>>;
    async fn get_aggregated_stats(&self, owner_wallet: &str) -> anyhow::Result<serde_json::Value>;
}

//! The menu dispatch layer (§4.3): callback routing, wizard advancement,
//! text-input coupling, and the outer error-handling wrapper.

use std::sync::Arc;

use chatgate_common::collaborators::{CopyTradingOrchestrator, CredentialsManager, ExecutionService, FeedManager};
use chatgate_common::types::Button;
use tokio::sync::Mutex;

use crate::{
    error::{Error, Result},
    render::MenuView,
    state::{MenuState, MenuStateStore, OrderSide, OrderType, PendingTextInput},
    token::{self, Action, Token},
    wizard,
};

/// The menu service: owns per-user state and the collaborator handles its
/// handlers call into. Cheap to clone — the state store and collaborators
/// are behind `Arc`/interior mutability.
#[derive(Clone)]
pub struct MenuService {
    states: Arc<Mutex<MenuStateStore>>,
    feed: Arc<dyn FeedManager>,
    execution: Arc<dyn ExecutionService>,
    credentials: Arc<dyn CredentialsManager>,
    copy_trading: Arc<dyn CopyTradingOrchestrator>,
}

impl MenuService {
    #[must_use]
    pub fn new(
        feed: Arc<dyn FeedManager>,
        execution: Arc<dyn ExecutionService>,
        credentials: Arc<dyn CredentialsManager>,
        copy_trading: Arc<dyn CopyTradingOrchestrator>,
    ) -> Self {
        Self { states: Arc::new(Mutex::new(MenuStateStore::new())), feed, execution, credentials, copy_trading }
    }

    /// Clear `MenuState` for a user (`/start`, `/new`, or `clearState`).
    pub async fn clear_state(&self, user_id: &str) {
        self.states.lock().await.clear(user_id);
    }

    /// §4.3 dispatch: steps 1-6, wrapped so any handler error renders a
    /// `Main Menu` error card rather than propagating.
    pub async fn handle_callback(&self, user_id: &str, chat_id: &str, raw_token: &str) -> MenuView {
        match self.try_handle_callback(user_id, chat_id, raw_token).await {
            Ok(view) => view,
            Err(err) => {
                tracing::warn!(user_id, chat_id, error = %err, "menu handler failed");
                MenuView::main_menu_error(format!("Something went wrong: {err}"))
            },
        }
    }

    async fn try_handle_callback(&self, user_id: &str, chat_id: &str, raw_token: &str) -> Result<MenuView> {
        let token = token::parse(raw_token)?;

        if token.action == Action::Noop {
            // Step 2: no edit. An empty-text view signals the transport
            // layer to skip the edit entirely (§4.3 step 6).
            return Ok(MenuView::new(String::new()));
        }

        let mut states = self.states.lock().await;
        let state = states.get_or_create(user_id, chat_id);
        let previous_menu = state.current_menu.clone();

        if !matches!(token.action, Action::Back | Action::Refresh) {
            state.push_history(&previous_menu);
        }

        let view = self.route(state, &token).await?;
        // `Back`/`Refresh` set `current_menu` themselves inside `route` (to
        // the popped-history target, or left untouched to re-show the same
        // menu) — `menu_name_for` only knows the token's action, not what
        // was actually rendered, and would otherwise stamp the literal
        // strings "back"/"refresh" over the real menu name.
        if !matches!(token.action, Action::Back | Action::Refresh) {
            state.current_menu = menu_name_for(&token);
        }
        Ok(view)
    }

    async fn route(&self, state: &mut MenuState, token: &Token) -> Result<MenuView> {
        match token.action {
            Action::Menu => Ok(render_named_menu(token.params.first().map(String::as_str))),
            Action::Back => {
                let target = state.pop_history();
                state.current_menu = target.clone();
                Ok(render_named_menu(Some(&target)))
            },
            Action::Refresh => Ok(render_named_menu(Some(&state.current_menu.clone()))),
            Action::Search => self.handle_search(state, token).await,
            Action::Market => self.handle_market(state, token).await,
            Action::Buy | Action::Sell | Action::LimitBuy | Action::LimitSell => self.start_wizard(state, token),
            Action::Order => self.handle_order(state, token).await,
            Action::Wallet => Ok(render_wallet_menu()),
            Action::Copy => self.handle_copy(state, token).await,
            Action::Orders => self.handle_orders(token).await,
            Action::Cancel => self.handle_cancel_order(token).await,
            Action::Pos | Action::Find | Action::QuickBuy => {
                Ok(MenuView::new(format!("{} is not yet wired to a handler", token.action.as_str())))
            },
            Action::Noop => unreachable!("handled before routing"),
        }
    }

    async fn handle_search(&self, state: &mut MenuState, token: &Token) -> Result<MenuView> {
        let query = token.params.first().cloned().unwrap_or_default();
        let page: u32 = token.params.get(1).and_then(|p| p.parse().ok()).unwrap_or(1);
        state.search_query = Some(query.clone());
        state.search_page = page;

        let markets = self
            .feed
            .search_markets(&query, "polymarket")
            .await
            .map_err(|e| Error::ExecutionFailed(e.to_string()))?;
        let mut lines = vec![format!("Results for \"{query}\" (page {page}):")];
        for market in markets.iter().take(10) {
            lines.push(format!("- {} ({})", market.title, market.id));
        }
        Ok(MenuView::new(lines.join("\n")))
    }

    async fn handle_market(&self, state: &mut MenuState, token: &Token) -> Result<MenuView> {
        let market_id = token.params.first().cloned().unwrap_or_default();
        let market = self
            .feed
            .get_market(&market_id, "polymarket")
            .await
            .map_err(|e| Error::ExecutionFailed(e.to_string()))?;
        state.selected_market = Some(market_id.clone());
        match market {
            Some(m) => Ok(MenuView::new(format!("{}\nLast price: {:?}", m.title, m.last_price)).with_buttons(
                vec![vec![
                    Button::callback("Buy", format!("buy:{market_id}")),
                    Button::callback("Sell", format!("sell:{market_id}")),
                ]],
            )),
            None => Ok(MenuView::new("Market not found")),
        }
    }

    fn start_wizard(&self, state: &mut MenuState, token: &Token) -> Result<MenuView> {
        let token_id = token.params.first().cloned().unwrap_or_default();
        state.selected_token = Some(token_id.clone());
        state.order_side = Some(match token.action {
            Action::Buy | Action::LimitBuy => OrderSide::Buy,
            _ => OrderSide::Sell,
        });
        state.order_type = Some(match token.action {
            Action::LimitBuy | Action::LimitSell => OrderType::Limit,
            _ => OrderType::Market,
        });

        let mut rows: Vec<Vec<Button>> = wizard::SIZE_TIERS_USD
            .chunks(2)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|size| Button::callback(format!("${size:.0}"), format!("order:size:{token_id}:{size}")))
                    .collect()
            })
            .collect();
        rows.push(vec![Button::callback("Custom amount", format!("order:custom:{token_id}"))]);
        Ok(MenuView::new("Choose an order size").with_buttons(rows))
    }

    async fn handle_orders(&self, token: &Token) -> Result<MenuView> {
        match token.params.first().map(String::as_str) {
            Some("cancelall") => Ok(MenuView::new("Cancel all open orders?").with_buttons(vec![vec![
                Button::callback("Confirm", "orders:exec:cancelall"),
            ]])),
            Some("exec") if token.params.get(1).map(String::as_str) == Some("cancelall") => {
                match self.execution.cancel_all_orders("polymarket").await {
                    Ok(result) if result.success => Ok(MenuView::new("All open orders cancelled")),
                    Ok(result) => Ok(MenuView::new(format!("Cancel failed: {}", result.error.unwrap_or_default()))),
                    Err(err) => Ok(MenuView::new(format!("Cancel failed: {err}"))),
                }
            },
            _ => {
                let orders = self
                    .execution
                    .get_open_orders("polymarket")
                    .await
                    .map_err(|e| Error::ExecutionFailed(e.to_string()))?;
                if orders.is_empty() {
                    return Ok(MenuView::new("No open orders"));
                }
                let mut lines = vec!["Open orders:".to_string()];
                let mut buttons = Vec::new();
                for order in &orders {
                    lines.push(format!("{} {} {} @ {:?}", order.side, order.size, order.token_id, order.price));
                    buttons.push(vec![Button::callback(format!("Cancel {}", order.order_id), format!("cancel:{}", order.order_id))]);
                }
                buttons.push(vec![Button::callback("Cancel all", "orders:cancelall")]);
                Ok(MenuView::new(lines.join("\n")).with_buttons(buttons))
            },
        }
    }

    /// §6.1 `copy:*` token family. `toggle`/`del`/`stats`/`exec:add`/
    /// `exec:del` map onto `CopyTradingOrchestrator`/`CredentialsManager`
    /// (§6.2); `discover`/`activity` have no defined collaborator surface
    /// in §6.2 and are rendered as honest not-yet-wired views rather than
    /// invented (same treatment as `pos`/`find`/`quickbuy`, see
    /// `DESIGN.md`). `filter` is pure client-side state, no collaborator
    /// call needed.
    async fn handle_copy(&self, state: &mut MenuState, token: &Token) -> Result<MenuView> {
        match token.params.first().map(String::as_str) {
            Some("add") => {
                state.pending_text_input = Some(PendingTextInput::CopyAdd);
                Ok(MenuView::new("Send the wallet address to copy"))
            },
            Some("toggle") => {
                let cfg_id = token.params.get(1).cloned().unwrap_or_default();
                let configs = self.copy_trading.list_configs(&state.user_id).await.map_err(|e| Error::ExecutionFailed(e.to_string()))?;
                let currently_enabled = configs
                    .iter()
                    .find(|c| c.get("id").and_then(|v| v.as_str()) == Some(cfg_id.as_str()))
                    .and_then(|c| c.get("enabled"))
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                self.copy_trading
                    .toggle_config(&cfg_id, !currently_enabled)
                    .await
                    .map_err(|e| Error::ExecutionFailed(e.to_string()))?;
                Ok(MenuView::new(format!("Copy config {cfg_id} {}", if currently_enabled { "paused" } else { "activated" })))
            },
            Some("del") => {
                let cfg_id = token.params.get(1).cloned().unwrap_or_default();
                self.copy_trading.delete_config(&cfg_id).await.map_err(|e| Error::ExecutionFailed(e.to_string()))?;
                Ok(MenuView::new(format!("Removed copy config {cfg_id}")))
            },
            Some("stats") => {
                let cfg_id = token.params.get(1).cloned().unwrap_or_default();
                let history = self.copy_trading.get_history(&cfg_id).await.map_err(|e| Error::ExecutionFailed(e.to_string()))?;
                if history.is_empty() {
                    Ok(MenuView::new(format!("No activity yet for {cfg_id}")))
                } else {
                    let mut lines = vec![format!("Recent activity for {cfg_id}:")];
                    lines.extend(history.iter().take(10).map(|entry| entry.to_string()));
                    Ok(MenuView::new(lines.join("\n")))
                }
            },
            Some("filter") => {
                let filter = token.params.get(1).cloned().unwrap_or_else(|| "all".to_string());
                state.copy_filter = Some(filter.clone());
                Ok(MenuView::new(format!("Showing {filter} copy configs")))
            },
            Some("exec") if token.params.get(1).map(String::as_str) == Some("add") => {
                let wallet = token.params.get(2).cloned().unwrap_or_default();
                let has_credentials = self
                    .credentials
                    .has_credentials(&wallet, "polymarket")
                    .await
                    .map_err(|e| Error::ExecutionFailed(e.to_string()))?;
                if !has_credentials {
                    return Ok(MenuView::new(format!(
                        "{wallet} has no linked Polymarket credentials yet. Link credentials before adding it to copy-trading."
                    )));
                }
                self.copy_trading
                    .create_config(&wallet, serde_json::json!({ "wallet": wallet }))
                    .await
                    .map_err(|e| Error::ExecutionFailed(e.to_string()))?;
                state.pending_wallet = None;
                Ok(MenuView::new(format!("Now copying {wallet}")))
            },
            Some("exec") if token.params.get(1).map(String::as_str) == Some("del") => {
                let cfg_id = token.params.get(2).cloned().unwrap_or_default();
                self.copy_trading.delete_config(&cfg_id).await.map_err(|e| Error::ExecutionFailed(e.to_string()))?;
                Ok(MenuView::new(format!("Removed copy config {cfg_id}")))
            },
            Some("discover") | Some("activity") => {
                Ok(MenuView::new(format!("copy:{} is not yet wired to a handler", token.params.first().cloned().unwrap_or_default())))
            },
            _ => Ok(render_copy_menu_default()),
        }
    }

    async fn handle_cancel_order(&self, token: &Token) -> Result<MenuView> {
        let order_id = token.params.first().cloned().unwrap_or_default();
        match self.execution.cancel_order("polymarket", &order_id).await {
            Ok(result) if result.success => Ok(MenuView::new(format!("Order {order_id} cancelled"))),
            Ok(result) => Ok(MenuView::new(format!("Cancel failed: {}", result.error.unwrap_or_default()))),
            Err(err) => Ok(MenuView::new(format!("Cancel failed: {err}"))),
        }
    }

    async fn handle_order(&self, state: &mut MenuState, token: &Token) -> Result<MenuView> {
        let sub = token.params.first().map(String::as_str).unwrap_or("");
        match sub {
            "size" => {
                let size: f64 = token
                    .params
                    .get(2)
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| Error::InvalidSize("missing size".into()))?;
                state.order_size = Some(size);
                if state.order_type == Some(OrderType::Limit) {
                    let tiers = wizard::price_tiers(wizard::MARKET_PRICE_FLOOR);
                    let token_id = state.selected_token.clone().unwrap_or_default();
                    let buttons = tiers
                        .chunks(2)
                        .map(|chunk| {
                            chunk
                                .iter()
                                .map(|p| {
                                    Button::callback(format!("{:.0}c", p * 100.0), format!("order:price:{token_id}:{p}"))
                                })
                                .collect()
                        })
                        .collect();
                    Ok(MenuView::new("Choose a limit price").with_buttons(buttons))
                } else {
                    Ok(render_confirm(state))
                }
            },
            "price" => {
                let price: f64 = token
                    .params
                    .get(2)
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| Error::InvalidSize("missing price".into()))?;
                state.order_price = Some(price);
                Ok(render_confirm(state))
            },
            "custom" => {
                state.pending_text_input = Some(PendingTextInput::OrderSizeCustom);
                Ok(MenuView::new("Enter a custom USD amount"))
            },
            "exec" => self.execute_order(state).await,
            _ => Ok(MenuView::new("Unknown order step")),
        }
    }

    async fn execute_order(&self, state: &mut MenuState) -> Result<MenuView> {
        let token_id = state.selected_token.clone().unwrap_or_default();
        let size = state.order_size.unwrap_or(0.0);
        let result = match (state.order_side, state.order_type) {
            (Some(OrderSide::Buy), Some(OrderType::Market)) => {
                self.execution.market_buy("polymarket", &token_id, size).await
            },
            (Some(OrderSide::Sell), Some(OrderType::Market)) => {
                self.execution.market_sell("polymarket", &token_id, size).await
            },
            (Some(OrderSide::Buy), Some(OrderType::Limit)) => {
                self.execution.buy_limit("polymarket", &token_id, size, state.order_price.unwrap_or(0.5)).await
            },
            (Some(OrderSide::Sell), Some(OrderType::Limit)) => {
                self.execution.sell_limit("polymarket", &token_id, size, state.order_price.unwrap_or(0.5)).await
            },
            _ => return Err(Error::ExecutionFailed("no order in progress".into())),
        };

        match result {
            Ok(exec) if exec.success => Ok(MenuView::new(format!(
                "Order placed: {}\nFilled: {:?} @ {:?}",
                exec.order_id.unwrap_or_default(),
                exec.filled_size,
                exec.avg_fill_price
            ))),
            Ok(exec) => Ok(MenuView::new(format!("Order failed: {}", exec.error.unwrap_or_default())).with_buttons(
                vec![vec![Button::callback("Retry", format!("buy:{token_id}"))]],
            )),
            Err(err) => Ok(MenuView::new(format!("Order failed: {err}"))
                .with_buttons(vec![vec![Button::callback("Retry", format!("buy:{token_id}"))]])),
        }
    }

    /// §4.3 "Text-input coupling": consulted before general command/agent
    /// dispatch. Returns `None` when the current state does not consume
    /// free-form text, signaling the caller to fall through.
    pub async fn handle_text_input(&self, user_id: &str, chat_id: &str, text: &str) -> Option<MenuView> {
        let mut states = self.states.lock().await;
        let state = states.get_or_create(user_id, chat_id);
        match state.pending_text_input.clone()? {
            PendingTextInput::Search => {
                state.search_query = Some(text.to_string());
                state.search_page = 1;
                state.pending_text_input = None;
                Some(MenuView::new(format!("Searching for \"{text}\"...")))
            },
            PendingTextInput::CopyAdd => {
                if wizard::is_valid_eth_address(text) {
                    let address = text.trim().to_string();
                    state.pending_wallet = Some(address.clone());
                    state.pending_text_input = None;
                    Some(
                        MenuView::new(format!("Add {address} to copy-trading?"))
                            .with_buttons(vec![vec![Button::callback("Confirm", format!("copy:exec:add:{address}"))]]),
                    )
                } else {
                    Some(MenuView::new("That doesn't look like a wallet address. Try again."))
                }
            },
            PendingTextInput::OrderSizeCustom => match wizard::parse_custom_size(text) {
                Ok(size) => {
                    state.order_size = Some(size);
                    state.pending_text_input = None;
                    Some(render_confirm(state))
                },
                Err(err) => Some(MenuView::new(format!("{err}. Try again."))),
            },
        }
    }
}

fn render_confirm(state: &MenuState) -> MenuView {
    let side = match state.order_side {
        Some(OrderSide::Buy) => "BUY",
        Some(OrderSide::Sell) => "SELL",
        None => "?",
    };
    let size = state.order_size.unwrap_or(0.0);
    let shares = wizard::estimate_shares(size, state.order_price);
    let token_id = state.selected_token.clone().unwrap_or_default();
    let mut text = format!("{side} {token_id}\nSize: ${size:.2}\nEst. shares: {shares:.2}");
    if let Some(price) = state.order_price {
        text.push_str(&format!("\nPrice: {:.0}c", price * 100.0));
    }
    MenuView::new(text).with_buttons(vec![vec![Button::callback("Confirm", format!("order:exec:{token_id}"))]])
}

fn menu_name_for(token: &Token) -> String {
    match token.action {
        Action::Menu => token.params.first().cloned().unwrap_or_else(|| "main".to_string()),
        Action::Market => "market".to_string(),
        Action::Search => "search".to_string(),
        Action::Wallet => "wallet".to_string(),
        Action::Copy => "copy".to_string(),
        Action::Buy | Action::Sell | Action::LimitBuy | Action::LimitSell => "size_select".to_string(),
        Action::Order => "order".to_string(),
        other => other.as_str().to_string(),
    }
}

fn render_named_menu(name: Option<&str>) -> MenuView {
    let name = name.unwrap_or("main");
    match name {
        "main" => MenuView::new("Main Menu").with_buttons(vec![
            vec![Button::callback("Search", "search::1"), Button::callback("Portfolio", "pos")],
            vec![Button::callback("Orders", "orders"), Button::callback("Wallet", "wallet")],
        ]),
        "portfolio" | "pos" => MenuView::new("Your positions"),
        "orders" => MenuView::new("Your open orders"),
        "wallet" => render_wallet_menu(),
        "search" => MenuView::new("Type a search query")
            .with_buttons(vec![vec![Button::callback("Trending", "search:_trending:1")]]),
        "copy" => render_copy_menu_default(),
        "settings" => MenuView::new("Settings"),
        other => MenuView::new(format!("Unknown menu {other}")),
    }
}

fn render_wallet_menu() -> MenuView {
    MenuView::new("Wallet").with_buttons(vec![vec![
        Button::callback("Deposit", "wallet:deposit"),
        Button::callback("Withdraw", "wallet:withdraw"),
    ]])
}

fn render_copy_menu_default() -> MenuView {
    MenuView::new("Copy trading").with_buttons(vec![vec![Button::callback("Add wallet", "copy:add")]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatgate_common::collaborators::{ExecutionResult, Market, OpenOrder};

    struct FakeFeed;

    #[async_trait]
    impl FeedManager for FakeFeed {
        async fn get_market(&self, id: &str, platform: &str) -> anyhow::Result<Option<Market>> {
            Ok(Some(Market {
                id: id.to_string(),
                platform: platform.to_string(),
                title: "Will it rain?".into(),
                last_price: Some(0.42),
            }))
        }

        async fn search_markets(&self, query: &str, _platform: &str) -> anyhow::Result<Vec<Market>> {
            Ok(vec![Market { id: "m1".into(), platform: "polymarket".into(), title: format!("{query} market"), last_price: Some(0.5) }])
        }
    }

    struct FakeExecution;

    #[async_trait]
    impl ExecutionService for FakeExecution {
        async fn market_buy(&self, _platform: &str, token_id: &str, size_usd: f64) -> anyhow::Result<ExecutionResult> {
            Ok(ExecutionResult {
                success: true,
                order_id: Some(format!("order-{token_id}")),
                status: Some("filled".into()),
                avg_fill_price: Some(0.5),
                filled_size: Some(size_usd),
                error: None,
            })
        }

        async fn market_sell(&self, platform: &str, token_id: &str, size_usd: f64) -> anyhow::Result<ExecutionResult> {
            self.market_buy(platform, token_id, size_usd).await
        }

        async fn buy_limit(&self, platform: &str, token_id: &str, size_usd: f64, _price: f64) -> anyhow::Result<ExecutionResult> {
            self.market_buy(platform, token_id, size_usd).await
        }

        async fn sell_limit(&self, platform: &str, token_id: &str, size_usd: f64, _price: f64) -> anyhow::Result<ExecutionResult> {
            self.market_buy(platform, token_id, size_usd).await
        }

        async fn get_open_orders(&self, _platform: &str) -> anyhow::Result<Vec<OpenOrder>> {
            Ok(Vec::new())
        }

        async fn cancel_order(&self, _platform: &str, _order_id: &str) -> anyhow::Result<ExecutionResult> {
            Ok(ExecutionResult::failure("not found"))
        }

        async fn cancel_all_orders(&self, _platform: &str) -> anyhow::Result<ExecutionResult> {
            Ok(ExecutionResult::failure("not found"))
        }
    }

    struct FakeCredentials {
        known_wallet: &'static str,
    }

    #[async_trait]
    impl chatgate_common::collaborators::CredentialsManager for FakeCredentials {
        async fn has_credentials(&self, wallet: &str, _platform: &str) -> anyhow::Result<bool> {
            Ok(wallet == self.known_wallet)
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

    #[derive(Default)]
    struct FakeCopyTrading {
        configs: tokio::sync::Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl chatgate_common::collaborators::CopyTradingOrchestrator for FakeCopyTrading {
        async fn initialize(&self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn shutdown(&self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn list_configs(&self, _owner_wallet: &str) -> anyhow::Result<Vec<serde_json::Value>> {
            Ok(self.configs.lock().await.clone())
        }
        async fn create_config(&self, owner_wallet: &str, _config: serde_json::Value) -> anyhow::Result<String> {
            let id = format!("cfg-{owner_wallet}");
            self.configs.lock().await.push(serde_json::json!({"id": id, "enabled": true}));
            Ok(id)
        }
        async fn update_config(&self, _config_id: &str, _config: serde_json::Value) -> anyhow::Result<()> {
            Ok(())
        }
        async fn delete_config(&self, config_id: &str) -> anyhow::Result<()> {
            self.configs.lock().await.retain(|c| c.get("id").and_then(|v| v.as_str()) != Some(config_id));
            Ok(())
        }
        async fn toggle_config(&self, config_id: &str, enabled: bool) -> anyhow::Result<()> {
            let mut configs = self.configs.lock().await;
            if let Some(cfg) = configs.iter_mut().find(|c| c.get("id").and_then(|v| v.as_str()) == Some(config_id)) {
                cfg["enabled"] = serde_json::json!(enabled);
            }
            Ok(())
        }
        async fn get_history(&self, _config_id: &str) -> anyhow::Result<Vec<serde_json::Value>> {
            Ok(Vec::new())
        }
        async fn get_aggregated_stats(&self, _owner_wallet: &str) -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::json!({}))
        }
    }

    fn service() -> MenuService {
        MenuService::new(
            Arc::new(FakeFeed),
            Arc::new(FakeExecution),
            Arc::new(FakeCredentials { known_wallet: "0xabc" }),
            Arc::new(FakeCopyTrading::default()),
        )
    }

    #[tokio::test]
    async fn noop_renders_empty_view_without_touching_history() {
        let svc = service();
        let view = svc.handle_callback("u1", "c1", "noop").await;
        assert!(view.text.is_empty());
    }

    #[tokio::test]
    async fn unknown_action_renders_main_menu_error() {
        let svc = service();
        let view = svc.handle_callback("u1", "c1", "bogus:1").await;
        assert!(view.text.contains("Something went wrong"));
        assert!(view.buttons.is_some());
    }

    #[tokio::test]
    async fn buy_then_size_then_confirm_walks_the_wizard() {
        let svc = service();
        svc.handle_callback("u1", "c1", "buy:tok1").await;
        let sized = svc.handle_callback("u1", "c1", "order:size:tok1:100").await;
        assert!(sized.text.contains("Est. shares"));
        let done = svc.handle_callback("u1", "c1", "order:exec:tok1").await;
        assert!(done.text.contains("Order placed"));
    }

    #[tokio::test]
    async fn back_pops_history_to_previous_menu() {
        let svc = service();
        svc.handle_callback("u1", "c1", "menu:wallet").await;
        svc.handle_callback("u1", "c1", "search:foo:1").await;
        let back = svc.handle_callback("u1", "c1", "back").await;
        assert_eq!(back.text, "Wallet");
    }

    #[tokio::test]
    async fn refresh_repeats_without_drifting_to_unknown_menu() {
        let svc = service();
        svc.handle_callback("u1", "c1", "menu:wallet").await;
        let first = svc.handle_callback("u1", "c1", "refresh").await;
        let second = svc.handle_callback("u1", "c1", "refresh").await;
        assert_eq!(first.text, "Wallet");
        assert_eq!(second.text, "Wallet");
    }

    #[tokio::test]
    async fn refresh_after_back_re_renders_the_popped_target() {
        let svc = service();
        svc.handle_callback("u1", "c1", "menu:wallet").await;
        svc.handle_callback("u1", "c1", "search:foo:1").await;
        svc.handle_callback("u1", "c1", "back").await;
        let refreshed = svc.handle_callback("u1", "c1", "refresh").await;
        assert_eq!(refreshed.text, "Wallet");
    }

    #[tokio::test]
    async fn copy_add_text_input_validates_eth_address() {
        let svc = service();
        let prompt = svc.handle_callback("u1", "c1", "copy:add").await;
        assert!(prompt.text.contains("wallet address"));
        let rejected = svc.handle_text_input("u1", "c1", "not an address").await.unwrap();
        assert!(rejected.text.contains("doesn't look like"));
        let accepted = svc
            .handle_text_input("u1", "c1", "0x1234567890123456789012345678901234567890")
            .await
            .unwrap();
        assert!(accepted.text.contains("copy-trading"));
    }

    #[tokio::test]
    async fn copy_exec_add_requires_credentials() {
        let svc = service();
        let no_creds = svc.handle_callback("u1", "c1", "copy:exec:add:0xdead").await;
        assert!(no_creds.text.contains("no linked Polymarket credentials"));
        let with_creds = svc.handle_callback("u1", "c1", "copy:exec:add:0xabc").await;
        assert!(with_creds.text.contains("Now copying 0xabc"));
    }

    #[tokio::test]
    async fn copy_toggle_flips_enabled_state() {
        let svc = service();
        svc.handle_callback("u1", "c1", "copy:exec:add:0xabc").await;
        let toggled = svc.handle_callback("u1", "c1", "copy:toggle:cfg-0xabc").await;
        assert!(toggled.text.contains("paused"));
        let toggled_again = svc.handle_callback("u1", "c1", "copy:toggle:cfg-0xabc").await;
        assert!(toggled_again.text.contains("activated"));
    }

    #[tokio::test]
    async fn copy_del_removes_config() {
        let svc = service();
        svc.handle_callback("u1", "c1", "copy:exec:add:0xabc").await;
        let removed = svc.handle_callback("u1", "c1", "copy:del:cfg-0xabc").await;
        assert!(removed.text.contains("Removed copy config"));
    }

    #[tokio::test]
    async fn text_input_falls_through_when_no_pending_state() {
        let svc = service();
        assert!(svc.handle_text_input("u1", "c1", "hello").await.is_none());
    }
}

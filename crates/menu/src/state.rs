//! Per-user menu state (§3 data model, I6).

use std::collections::HashMap;

/// Bound on `history` (I6).
pub const MAX_HISTORY: usize = 10;

/// Side of a wizard order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Market vs limit order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
}

/// Text-input sub-states the wizard / search flow can be waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingTextInput {
    Search,
    CopyAdd,
    OrderSizeCustom,
}

/// Per-user state, created lazily on first callback/text-input and living
/// for the process lifetime of the gateway (§3 "Lifecycles").
#[derive(Debug, Clone)]
pub struct MenuState {
    pub user_id: String,
    pub chat_id: String,
    pub current_menu: String,
    pub message_id: Option<String>,
    pub history: Vec<String>,
    pub pending_text_input: Option<PendingTextInput>,

    // Wizard slots.
    pub selected_market: Option<String>,
    pub selected_token: Option<String>,
    pub order_side: Option<OrderSide>,
    pub order_type: Option<OrderType>,
    pub order_size: Option<f64>,
    pub order_price: Option<f64>,
    pub search_query: Option<String>,
    pub search_page: u32,
    pub copy_filter: Option<String>,
    pub pending_wallet: Option<String>,
}

impl MenuState {
    #[must_use]
    pub fn new(user_id: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            chat_id: chat_id.into(),
            current_menu: "main".to_string(),
            message_id: None,
            history: Vec::new(),
            pending_text_input: None,
            selected_market: None,
            selected_token: None,
            order_side: None,
            order_type: None,
            order_size: None,
            order_price: None,
            search_query: None,
            search_page: 1,
            copy_filter: None,
            pending_wallet: None,
        }
    }

    /// §4.3 dispatch step 3: push the previous menu onto history unless it
    /// is `main`, `back`, or `refresh`, and only if it differs from the
    /// current top of stack (dedup of consecutive entries, I6).
    pub fn push_history(&mut self, previous_menu: &str) {
        if matches!(previous_menu, "main" | "back" | "refresh") {
            return;
        }
        if self.history.last().map(String::as_str) == Some(previous_menu) {
            return;
        }
        self.history.push(previous_menu.to_string());
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }
    }

    /// `back`: pop history; empty stack returns to `main`.
    pub fn pop_history(&mut self) -> String {
        self.history.pop().unwrap_or_else(|| "main".to_string())
    }

    /// Reset to a fresh wizard/menu state, as done on `/start` or
    /// `clearState(userId)`. Preserves identity (`userId`/`chatId`) but
    /// drops everything else, including `messageId` so the next render
    /// sends a new message rather than editing a stale one.
    pub fn clear(&mut self) {
        let fresh = Self::new(self.user_id.clone(), self.chat_id.clone());
        *self = fresh;
    }
}

/// Process-lifetime store of per-user menu state. A real orchestrator
/// shares one of these across the gateway process (§9 "ownership of
/// long-lived state").
#[derive(Debug, Default)]
pub struct MenuStateStore {
    states: HashMap<String, MenuState>,
}

impl MenuStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or lazily create the state for `user_id`.
    pub fn get_or_create(&mut self, user_id: &str, chat_id: &str) -> &mut MenuState {
        self.states
            .entry(user_id.to_string())
            .or_insert_with(|| MenuState::new(user_id, chat_id))
    }

    pub fn clear(&mut self, user_id: &str) {
        if let Some(state) = self.states.get_mut(user_id) {
            state.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_dedupes_consecutive_entries() {
        let mut state = MenuState::new("u1", "c1");
        state.push_history("search");
        state.push_history("search");
        assert_eq!(state.history, vec!["search".to_string()]);
    }

    #[test]
    fn history_skips_main_back_refresh() {
        let mut state = MenuState::new("u1", "c1");
        state.push_history("main");
        state.push_history("back");
        state.push_history("refresh");
        assert!(state.history.is_empty());
    }

    #[test]
    fn history_bounded_at_ten() {
        let mut state = MenuState::new("u1", "c1");
        for i in 0..15 {
            state.push_history(&format!("menu{i}"));
        }
        assert_eq!(state.history.len(), MAX_HISTORY);
        assert_eq!(state.history.first(), Some(&"menu5".to_string()));
        assert_eq!(state.history.last(), Some(&"menu14".to_string()));
    }

    #[test]
    fn pop_history_empty_returns_main() {
        let mut state = MenuState::new("u1", "c1");
        assert_eq!(state.pop_history(), "main");
    }

    #[test]
    fn clear_preserves_identity_but_resets_everything_else() {
        let mut state = MenuState::new("u1", "c1");
        state.current_menu = "buy".to_string();
        state.message_id = Some("42".to_string());
        state.push_history("search");
        state.clear();
        assert_eq!(state.current_menu, "main");
        assert!(state.message_id.is_none());
        assert!(state.history.is_empty());
        assert_eq!(state.user_id, "u1");
    }
}

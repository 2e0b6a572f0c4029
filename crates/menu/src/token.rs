//! Callback tokens (§4.3, I5): `action:param1:param2:...`, ASCII, ≤64 bytes
//! UTF-8 including separators. Tokens are opaque to the user; actions are
//! drawn from a closed set.

use crate::error::{Error, Result};

pub const MAX_TOKEN_BYTES: usize = 64;

/// The closed action set from §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Menu,
    Search,
    Market,
    Buy,
    Sell,
    LimitBuy,
    LimitSell,
    Order,
    Pos,
    Cancel,
    Orders,
    Wallet,
    Copy,
    Refresh,
    Back,
    Noop,
    Find,
    QuickBuy,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Search => "search",
            Self::Market => "market",
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::LimitBuy => "limitb",
            Self::LimitSell => "limits",
            Self::Order => "order",
            Self::Pos => "pos",
            Self::Cancel => "cancel",
            Self::Orders => "orders",
            Self::Wallet => "wallet",
            Self::Copy => "copy",
            Self::Refresh => "refresh",
            Self::Back => "back",
            Self::Noop => "noop",
            Self::Find => "find",
            Self::QuickBuy => "quickbuy",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "menu" => Self::Menu,
            "search" => Self::Search,
            "market" => Self::Market,
            "buy" => Self::Buy,
            "sell" => Self::Sell,
            "limitb" => Self::LimitBuy,
            "limits" => Self::LimitSell,
            "order" => Self::Order,
            "pos" => Self::Pos,
            "cancel" => Self::Cancel,
            "orders" => Self::Orders,
            "wallet" => Self::Wallet,
            "copy" => Self::Copy,
            "refresh" => Self::Refresh,
            "back" => Self::Back,
            "noop" => Self::Noop,
            "find" => Self::Find,
            "quickbuy" => Self::QuickBuy,
            _ => return None,
        })
    }
}

/// A decoded callback token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub action: Action,
    pub params: Vec<String>,
}

/// Build `action:p1:p2:...`, validating the 64-byte budget. Callers
/// truncate/encode IDs defensively before calling this — it only checks,
/// it does not truncate for them, so a caller-side bug fails loudly in
/// tests rather than silently corrupting a token downstream.
pub fn build(action: Action, params: &[&str]) -> Result<String> {
    let mut token = action.as_str().to_string();
    for p in params {
        token.push(':');
        token.push_str(p);
    }
    if token.len() > MAX_TOKEN_BYTES {
        return Err(Error::TokenTooLong);
    }
    Ok(token)
}

/// Parse a raw callback token.
pub fn parse(raw: &str) -> Result<Token> {
    if raw.len() > MAX_TOKEN_BYTES {
        return Err(Error::TokenTooLong);
    }
    let mut parts = raw.split(':');
    let action_str = parts.next().unwrap_or("");
    let action = Action::parse(action_str).ok_or_else(|| Error::UnknownAction(action_str.to_string()))?;
    let params = parts.map(str::to_string).collect();
    Ok(Token { action, params })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_build_and_parse() {
        let raw = build(Action::Market, &["TOKEN123"]).unwrap();
        let token = parse(&raw).unwrap();
        assert_eq!(token.action, Action::Market);
        assert_eq!(token.params, vec!["TOKEN123"]);
    }

    #[test]
    fn rejects_unknown_action() {
        assert!(matches!(parse("frobnicate:1"), Err(Error::UnknownAction(_))));
    }

    #[test]
    fn rejects_oversized_token() {
        let huge = "x".repeat(100);
        assert!(matches!(build(Action::Market, &[&huge]), Err(Error::TokenTooLong)));
    }

    #[test]
    fn noop_has_no_params() {
        let raw = build(Action::Noop, &[]).unwrap();
        assert_eq!(raw, "noop");
    }
}

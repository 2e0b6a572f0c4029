//! Buy/sell wizard flow (§4.3 "Wizard flow (buy/sell × market/limit)").

use crate::error::{Error, Result};

/// Fixed USD size tiers offered at `size_select`.
pub const SIZE_TIERS_USD: &[f64] = &[10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0];

pub const MIN_CUSTOM_SIZE_USD: f64 = 0.0;
pub const MAX_CUSTOM_SIZE_USD: f64 = 10_000.0;

/// Parse a free-form size string: strip `$` and commas, reject `<= 0` or
/// `> $10,000`.
pub fn parse_custom_size(raw: &str) -> Result<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '$' && *c != ',').collect();
    let value: f64 = cleaned
        .parse()
        .map_err(|_| Error::InvalidSize(raw.to_string()))?;
    if value <= MIN_CUSTOM_SIZE_USD || value > MAX_CUSTOM_SIZE_USD {
        return Err(Error::InvalidSize(raw.to_string()));
    }
    Ok(value)
}

/// Six price tiers around `live_price_cents` at `{0, ±5, ±10, ±20}` cents,
/// clamped to `[0.01, 0.99]` (displayed as cents, so the caller multiplies
/// by 100 for display).
#[must_use]
pub fn price_tiers(live_price: f64) -> Vec<f64> {
    const OFFSETS_CENTS: [i32; 6] = [-20, -10, -5, 0, 5, 10];
    OFFSETS_CENTS
        .iter()
        .map(|offset_cents| {
            let price = live_price + f64::from(*offset_cents) / 100.0;
            price.clamp(0.01, 0.99)
        })
        .collect()
}

/// Floor used when no live price is known for a market order.
pub const MARKET_PRICE_FLOOR: f64 = 0.50;

/// Estimated shares for a given size/price. Market orders use the last
/// known price, or [`MARKET_PRICE_FLOOR`] if none is available.
#[must_use]
pub fn estimate_shares(size_usd: f64, price: Option<f64>) -> f64 {
    let effective_price = price.unwrap_or(MARKET_PRICE_FLOOR);
    if effective_price <= 0.0 {
        return 0.0;
    }
    size_usd / effective_price
}

/// Ethereum-style hex address, matched per §4.3 "Text-input coupling".
#[must_use]
pub fn is_valid_eth_address(text: &str) -> bool {
    let trimmed = text.trim();
    if !trimmed.len().eq(&42) {
        return false;
    }
    let Some(hex_part) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) else {
        return false;
    };
    hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dollar_and_comma_formatted_size() {
        assert_eq!(parse_custom_size("$1,250.50").unwrap(), 1250.50);
        assert_eq!(parse_custom_size("75").unwrap(), 75.0);
    }

    #[test]
    fn rejects_non_positive_and_oversized_values() {
        assert!(parse_custom_size("0").is_err());
        assert!(parse_custom_size("-10").is_err());
        assert!(parse_custom_size("10001").is_err());
        assert!(parse_custom_size("10000").is_ok());
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(parse_custom_size("not a number").is_err());
    }

    #[test]
    fn price_tiers_are_clamped() {
        let tiers = price_tiers(0.02);
        assert!(tiers.iter().all(|p| (0.01..=0.99).contains(p)));
        assert_eq!(tiers.len(), 6);

        let tiers_high = price_tiers(0.97);
        assert!(tiers_high.iter().all(|p| *p <= 0.99));
    }

    #[test]
    fn estimate_shares_uses_market_floor_when_no_price() {
        let shares = estimate_shares(100.0, None);
        assert!((shares - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn estimate_shares_uses_given_limit_price() {
        let shares = estimate_shares(10.0, Some(0.25));
        assert!((shares - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn eth_address_validation() {
        assert!(is_valid_eth_address("0x1234567890123456789012345678901234567890"));
        assert!(is_valid_eth_address("0XABCDEF1234567890123456789012345678901234"));
        assert!(!is_valid_eth_address("0x123"));
        assert!(!is_valid_eth_address("1234567890123456789012345678901234567890"));
        assert!(!is_valid_eth_address("0xZZZ4567890123456789012345678901234567890"));
    }
}

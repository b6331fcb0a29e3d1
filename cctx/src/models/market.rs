//! Market entity and its invariants.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use super::id::MarketId;

/// A single prediction market, constructed by an adapter's `parse_market`
/// and immutable thereafter: a refreshed view is a new `Market`, not a
/// mutation of this one.
#[derive(Debug, Clone)]
pub struct Market {
    pub id: MarketId,
    pub question: String,
    /// Ordered outcome labels, e.g. `["Yes", "No"]`.
    pub outcomes: Vec<String>,
    pub close_time: Option<DateTime<Utc>>,
    pub volume: Decimal,
    pub liquidity: Decimal,
    /// Outcome label -> price in `[0, 1]`.
    pub prices: HashMap<String, Decimal>,
    /// Exchange-specific fields not promoted to typed struct members
    /// (`clobTokenIds`, `condition_id`, `slug`, ...). See module docs in
    /// [`crate::adapters::polymarket::parse`] for the recognised keys.
    pub metadata: HashMap<String, Value>,
    pub tick_size: Decimal,
    pub description: String,
    pub closed: bool,
}

impl Market {
    /// `true` iff the market has exactly two outcomes.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.outcomes.len() == 2
    }

    /// Sum of all outcome prices. For a well-formed binary market this
    /// is nominally close to 1, but callers should treat deviation as
    /// informative rather than erroring on it (upstream data is noisy).
    #[must_use]
    pub fn price_sum(&self) -> Decimal {
        self.prices.values().copied().sum()
    }

    /// A defensively-populated market for inputs that `parse_market`
    /// could not make sense of: empty outcomes, closed, zero volume.
    /// Total functions never panic; they return this instead.
    #[must_use]
    pub fn fallback(id: MarketId) -> Self {
        Self {
            id,
            question: String::new(),
            outcomes: Vec::new(),
            close_time: None,
            volume: Decimal::ZERO,
            liquidity: Decimal::ZERO,
            prices: HashMap::new(),
            metadata: HashMap::new(),
            tick_size: Decimal::new(1, 2), // 0.01
            description: String::new(),
            closed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn binary_market() -> Market {
        let mut prices = HashMap::new();
        prices.insert("Yes".to_string(), dec!(0.6));
        prices.insert("No".to_string(), dec!(0.4));
        Market {
            id: MarketId::new("m1"),
            question: "Will it rain?".to_string(),
            outcomes: vec!["Yes".to_string(), "No".to_string()],
            close_time: None,
            volume: dec!(1000),
            liquidity: dec!(500),
            prices,
            metadata: HashMap::new(),
            tick_size: dec!(0.01),
            description: String::new(),
            closed: false,
        }
    }

    #[test]
    fn binary_market_has_exactly_two_outcomes() {
        assert!(binary_market().is_binary());
    }

    #[test]
    fn binary_prices_sum_close_to_one() {
        let sum = binary_market().price_sum();
        assert_eq!(sum, dec!(1.0));
    }

    #[test]
    fn fallback_market_is_closed_with_empty_outcomes() {
        let market = Market::fallback(MarketId::new("broken"));
        assert!(market.closed);
        assert!(market.outcomes.is_empty());
        assert_eq!(market.tick_size, dec!(0.01));
    }
}

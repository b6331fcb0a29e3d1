//! Market selection and crypto-hourly question recognition.
//!
//! Optional utilities adapters may use to decide which markets are
//! worth subscribing to and, for the recurring "will BTC be above $X at
//! the top of the hour" family of markets, which token and direction a
//! question is asking about. Neither utility is required by
//! [`crate::exchange::Exchange`]; adapters opt in.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Market;

/// Criteria a market must satisfy to be considered eligible for
/// subscription. All fields default to "no restriction".
#[derive(Debug, Clone, Default)]
pub struct SelectionCriteria {
    pub require_binary: bool,
    pub require_open: bool,
    pub min_liquidity: Option<rust_decimal::Decimal>,
    /// If set, only markets whose `metadata` contains all of these keys
    /// (e.g. `clobTokenIds`) are eligible.
    pub require_metadata_keys: Vec<String>,
}

impl SelectionCriteria {
    #[must_use]
    pub fn is_eligible(&self, market: &Market) -> bool {
        if self.require_binary && !market.is_binary() {
            return false;
        }
        if self.require_open && market.closed {
            return false;
        }
        if let Some(min_liquidity) = self.min_liquidity {
            if market.liquidity < min_liquidity {
                return false;
            }
        }
        self.require_metadata_keys
            .iter()
            .all(|key| market.metadata.contains_key(key))
    }
}

/// Filter `markets` down to those satisfying `criteria`.
pub fn eligible_markets<'a>(markets: &'a [Market], criteria: &SelectionCriteria) -> Vec<&'a Market> {
    markets.iter().filter(|market| criteria.is_eligible(market)).collect()
}

/// Pick one market uniformly at random from `markets`. Returns `None`
/// for an empty slice.
pub fn select_random<'a, R: rand::Rng + ?Sized>(markets: &'a [Market], rng: &mut R) -> Option<&'a Market> {
    if markets.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..markets.len());
    markets.get(index)
}

/// Which way a crypto-hourly question is asking: "above" or "below" a
/// threshold at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A recognised crypto-hourly market question: which token it's about
/// and which direction it's asking about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoHourlySignal {
    pub token: String,
    pub direction: Direction,
}

// Matches questions of the shape "Will Bitcoin be above $68,000 at 3PM ET?"
// loosely enough to survive upstream question-wording variance; token and
// direction words are normalised separately rather than baked into the
// pattern so new aliases don't require touching the regex.
static CRYPTO_HOURLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(BTC|BITCOIN|ETH|ETHEREUM|SOL|SOLANA)\b.*?\b(ABOVE|OVER|REACH|BELOW|UNDER)\b")
        .expect("static crypto-hourly pattern is valid")
});

/// Recognise a crypto-hourly question, returning the normalised token
/// alias and direction if the question matches the expected shape.
#[must_use]
pub fn recognize_crypto_hourly(question: &str) -> Option<CryptoHourlySignal> {
    let captures = CRYPTO_HOURLY_RE.captures(question)?;
    let token = normalize_token_alias(captures.get(1)?.as_str());
    let direction = normalize_direction(captures.get(2)?.as_str())?;
    Some(CryptoHourlySignal { token, direction })
}

/// Normalise a recognised token alias to its canonical ticker.
#[must_use]
pub fn normalize_token_alias(raw: &str) -> String {
    match raw.to_ascii_uppercase().as_str() {
        "BITCOIN" => "BTC".to_string(),
        "ETHEREUM" => "ETH".to_string(),
        "SOLANA" => "SOL".to_string(),
        other => other.to_string(),
    }
}

/// Normalise a recognised direction word to [`Direction`].
#[must_use]
pub fn normalize_direction(raw: &str) -> Option<Direction> {
    match raw.to_ascii_uppercase().as_str() {
        "ABOVE" | "OVER" | "REACH" => Some(Direction::Up),
        "BELOW" | "UNDER" => Some(Direction::Down),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketId;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn market(id: &str, outcomes: usize, closed: bool, liquidity: rust_decimal::Decimal) -> Market {
        Market {
            id: MarketId::new(id),
            question: format!("market {id}"),
            outcomes: (0..outcomes).map(|i| format!("outcome-{i}")).collect(),
            close_time: None,
            volume: dec!(0),
            liquidity,
            prices: HashMap::new(),
            metadata: HashMap::new(),
            tick_size: dec!(0.01),
            description: String::new(),
            closed,
        }
    }

    #[test]
    fn is_eligible_rejects_non_binary_when_required() {
        let criteria = SelectionCriteria { require_binary: true, ..Default::default() };
        assert!(!criteria.is_eligible(&market("m1", 3, false, dec!(0))));
        assert!(criteria.is_eligible(&market("m1", 2, false, dec!(0))));
    }

    #[test]
    fn is_eligible_rejects_closed_markets_when_required() {
        let criteria = SelectionCriteria { require_open: true, ..Default::default() };
        assert!(!criteria.is_eligible(&market("m1", 2, true, dec!(0))));
    }

    #[test]
    fn is_eligible_enforces_minimum_liquidity() {
        let criteria = SelectionCriteria { min_liquidity: Some(dec!(100)), ..Default::default() };
        assert!(!criteria.is_eligible(&market("m1", 2, false, dec!(50))));
        assert!(criteria.is_eligible(&market("m1", 2, false, dec!(150))));
    }

    #[test]
    fn eligible_markets_filters_the_whole_slice() {
        let markets = vec![
            market("m1", 2, false, dec!(0)),
            market("m2", 3, false, dec!(0)),
        ];
        let criteria = SelectionCriteria { require_binary: true, ..Default::default() };
        let eligible = eligible_markets(&markets, &criteria);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, MarketId::new("m1"));
    }

    #[test]
    fn select_random_is_none_for_empty_slice() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert!(select_random(&[], &mut rng).is_none());
    }

    #[test]
    fn select_random_picks_one_of_the_candidates() {
        let markets = vec![market("m1", 2, false, dec!(0)), market("m2", 2, false, dec!(0))];
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let picked = select_random(&markets, &mut rng).expect("non-empty slice yields a pick");
        assert!(markets.iter().any(|m| m.id == picked.id));
    }

    #[test]
    fn recognizes_bitcoin_above_as_btc_up() {
        let signal = recognize_crypto_hourly("Will Bitcoin be above $68,000 at 3PM ET?").unwrap();
        assert_eq!(signal, CryptoHourlySignal { token: "BTC".to_string(), direction: Direction::Up });
    }

    #[test]
    fn recognizes_ethereum_below_as_eth_down() {
        let signal = recognize_crypto_hourly("Will Ethereum dip below $3,000 this hour?").unwrap();
        assert_eq!(signal, CryptoHourlySignal { token: "ETH".to_string(), direction: Direction::Down });
    }

    #[test]
    fn recognizes_solana_reach_as_sol_up() {
        let signal = recognize_crypto_hourly("Will SOL reach $200 by the hourly close?").unwrap();
        assert_eq!(signal, CryptoHourlySignal { token: "SOL".to_string(), direction: Direction::Up });
    }

    #[test]
    fn non_crypto_questions_are_not_recognized() {
        assert!(recognize_crypto_hourly("Will it rain in Seattle tomorrow?").is_none());
    }

    #[test]
    fn alias_normalization_is_case_insensitive() {
        assert_eq!(normalize_token_alias("bitcoin"), "BTC");
        assert_eq!(normalize_token_alias("btc"), "BTC");
        assert_eq!(normalize_direction("Over"), Some(Direction::Up));
        assert_eq!(normalize_direction("under"), Some(Direction::Down));
        assert_eq!(normalize_direction("sideways"), None);
    }
}

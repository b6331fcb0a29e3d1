//! Orderbook snapshot entity.

use rust_decimal::Decimal;

use super::id::{MarketId, TokenId};

/// A single price/size level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub price: Decimal,
    pub size: Decimal,
}

/// A point-in-time orderbook snapshot for one token.
///
/// Invariant: `bids` is ordered strictly descending by price, `asks`
/// strictly ascending; the book is never crossed (`bids[0] < asks[0]`).
#[derive(Debug, Clone)]
pub struct OrderbookData {
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    pub timestamp_ms: i64,
    pub asset_id: TokenId,
    pub market_id: MarketId,
}

impl OrderbookData {
    #[must_use]
    pub fn best_bid(&self) -> Option<Level> {
        self.bids.first().copied()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<Level> {
        self.asks.first().copied()
    }

    /// `true` iff the book has no crossed levels and is price-ordered on
    /// both sides.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let bids_descending = self.bids.windows(2).all(|w| w[0].price > w[1].price);
        let asks_ascending = self.asks.windows(2).all(|w| w[0].price < w[1].price);
        let not_crossed = match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price < ask.price,
            _ => true,
        };
        bids_descending && asks_ascending && not_crossed
    }

    /// Derive the "No" side of a binary market's book by inverting
    /// price (`p -> 1 - p`) and swapping sides: the "Yes" bids become
    /// "No" asks and vice versa, re-sorted and re-rounded to 3 decimal
    /// places (spec'd in `crate::orderbook`).
    #[must_use]
    pub fn invert_for_complementary_outcome(&self, new_asset_id: TokenId) -> Self {
        let invert = |levels: &[Level]| -> Vec<Level> {
            let mut out: Vec<Level> = levels
                .iter()
                .map(|level| Level {
                    price: (Decimal::ONE - level.price).round_dp(3),
                    size: level.size,
                })
                .collect();
            out
        };

        let mut new_bids = invert(&self.asks);
        let mut new_asks = invert(&self.bids);
        new_bids.sort_by(|a, b| b.price.cmp(&a.price));
        new_asks.sort_by(|a, b| a.price.cmp(&b.price));

        Self {
            bids: new_bids,
            asks: new_asks,
            timestamp_ms: self.timestamp_ms,
            asset_id: new_asset_id,
            market_id: self.market_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book() -> OrderbookData {
        OrderbookData {
            bids: vec![Level { price: dec!(0.6), size: dec!(50) }],
            asks: vec![Level { price: dec!(0.7), size: dec!(40) }],
            timestamp_ms: 1_700_000_000_000,
            asset_id: TokenId::new("yes-token"),
            market_id: MarketId::new("m1"),
        }
    }

    #[test]
    fn well_formed_book_is_not_crossed() {
        assert!(book().is_well_formed());
    }

    #[test]
    fn crossed_book_is_not_well_formed() {
        let mut b = book();
        b.asks[0].price = dec!(0.5);
        assert!(!b.is_well_formed());
    }

    #[test]
    fn no_side_inversion_matches_the_documented_example() {
        let inverted = book().invert_for_complementary_outcome(TokenId::new("no-token"));
        assert_eq!(inverted.bids, vec![Level { price: dec!(0.3), size: dec!(40) }]);
        assert_eq!(inverted.asks, vec![Level { price: dec!(0.4), size: dec!(50) }]);
    }
}

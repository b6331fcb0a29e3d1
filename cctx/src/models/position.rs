//! Position entity with derived P&L scalars.

use rust_decimal::Decimal;

use super::id::MarketId;

/// A held position in a single market outcome.
#[derive(Debug, Clone)]
pub struct Position {
    pub market_id: MarketId,
    pub outcome: String,
    pub size: Decimal,
    pub average_price: Decimal,
    pub current_price: Decimal,
}

impl Position {
    #[must_use]
    pub fn cost_basis(&self) -> Decimal {
        self.size * self.average_price
    }

    #[must_use]
    pub fn current_value(&self) -> Decimal {
        self.size * self.current_price
    }

    #[must_use]
    pub fn unrealized_pnl(&self) -> Decimal {
        self.current_value() - self.cost_basis()
    }
}

//! Order entity, status, and fill invariants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::id::{MarketId, OrderId, TokenId};

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    #[must_use]
    pub const fn as_wire_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Open,
    Filled,
    PartiallyFilled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// `true` iff the order can still receive fills.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Open | Self::PartiallyFilled)
    }
}

/// A single order as tracked by this client.
///
/// Invariant: `filled <= size` always holds; callers that derive a new
/// `Order` after a fill must preserve it.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub market_id: MarketId,
    pub token_id: TokenId,
    pub outcome: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub filled: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Remaining unfilled quantity.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.size - self.filled
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

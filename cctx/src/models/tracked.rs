//! Snapshot wrapper the order tracker keeps per registered order.

use std::time::Instant;

use rust_decimal::Decimal;

use super::order::Order;

/// An order under active tracking, plus the bookkeeping the tracker
/// needs: cumulative fill total and registration time.
///
/// Invariant: once `total_filled >= order.size`, the tracker removes
/// this entry exactly once.
#[derive(Debug, Clone)]
pub struct TrackedOrder {
    pub order: Order,
    pub total_filled: Decimal,
    pub created_time: Instant,
}

impl TrackedOrder {
    #[must_use]
    pub fn new(order: Order) -> Self {
        let total_filled = order.filled;
        Self {
            order,
            total_filled,
            created_time: Instant::now(),
        }
    }

    #[must_use]
    pub fn is_fully_filled(&self) -> bool {
        self.total_filled >= self.order.size
    }
}

//! Idempotent order tracker driven by trade (fill) events.
//!
//! Registration is idempotent by order ID. A trade event walks through a
//! single critical section (steps 1-4 of the spec'd algorithm); the
//! tracked entry is only removed, under a fresh lock acquisition, once
//! the order is fully filled.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{Order, OrderId, OrderStatus, TrackedOrder};

/// A fill report for a tracked order.
#[derive(Debug, Clone)]
pub struct Trade {
    pub order_id: OrderId,
    pub size: Decimal,
    pub price: Decimal,
}

/// Lifecycle events the tracker emits to registered callbacks.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    Created(Order),
    PartialFill(Order),
    Filled(Order),
    Cancelled(Order),
    Rejected(Order),
    Expired(Order),
}

/// A synchronous callback invoked on the caller's thread; the tracker
/// never spawns threads of its own.
pub type Callback = Arc<dyn Fn(LifecycleEvent) + Send + Sync>;

/// Idempotent registry mapping order ID to cumulative fill state.
#[derive(Default)]
pub struct OrderTracker {
    orders: Mutex<HashMap<OrderId, TrackedOrder>>,
    callbacks: Mutex<Vec<Callback>>,
}

impl OrderTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback to receive lifecycle events, in registration
    /// order.
    pub fn on_lifecycle_event(&self, callback: Callback) {
        self.callbacks.lock().push(callback);
    }

    /// Register an order for tracking. Re-registering an already-known
    /// ID is a no-op.
    pub fn register(&self, order: Order) {
        let mut orders = self.orders.lock();
        if orders.contains_key(&order.id) {
            return;
        }
        let id = order.id.clone();
        let tracked = TrackedOrder::new(order);
        let snapshot = tracked.order.clone();
        orders.insert(id, tracked);
        drop(orders);
        self.emit(LifecycleEvent::Created(snapshot));
    }

    /// Number of orders currently tracked.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.orders.lock().len()
    }

    /// Apply a trade to its matching tracked order. A trade for an
    /// unknown ID produces no event and no state change.
    pub fn apply_trade(&self, trade: Trade) {
        let (snapshot, fully_filled) = {
            let mut orders = self.orders.lock();
            let Some(tracked) = orders.get_mut(&trade.order_id) else {
                debug!(order_id = %trade.order_id, "trade for unknown order, ignoring");
                return;
            };

            tracked.total_filled += trade.size;
            let status = if tracked.is_fully_filled() {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };

            tracked.order.filled = tracked.total_filled;
            tracked.order.price = trade.price;
            tracked.order.status = status;
            tracked.order.updated_at = Some(chrono::Utc::now());

            let snapshot = tracked.order.clone();
            let fully_filled = tracked.is_fully_filled();
            (snapshot, fully_filled)
        };

        let event = if fully_filled {
            LifecycleEvent::Filled(snapshot)
        } else {
            LifecycleEvent::PartialFill(snapshot)
        };
        self.emit(event);

        if fully_filled {
            self.orders.lock().remove(&trade.order_id);
        }
    }

    /// Mark a tracked order cancelled, rejected, or expired, emitting
    /// the matching lifecycle event and removing the entry. A no-op for
    /// unknown IDs.
    pub fn finalize(&self, order_id: &OrderId, outcome: FinalOutcome) {
        let removed = self.orders.lock().remove(order_id);
        let Some(tracked) = removed else {
            return;
        };
        let mut snapshot = tracked.order;
        snapshot.status = outcome.status();
        snapshot.updated_at = Some(chrono::Utc::now());
        self.emit(outcome.into_event(snapshot));
    }

    fn emit(&self, event: LifecycleEvent) {
        for callback in self.callbacks.lock().iter() {
            callback(event.clone());
        }
    }
}

/// Terminal, non-fill outcomes a tracked order can reach.
#[derive(Debug, Clone, Copy)]
pub enum FinalOutcome {
    Cancelled,
    Rejected,
    Expired,
}

impl FinalOutcome {
    fn status(self) -> OrderStatus {
        match self {
            Self::Cancelled => OrderStatus::Cancelled,
            Self::Rejected => OrderStatus::Rejected,
            Self::Expired => OrderStatus::Cancelled,
        }
    }

    fn into_event(self, order: Order) -> LifecycleEvent {
        match self {
            Self::Cancelled => LifecycleEvent::Cancelled(order),
            Self::Rejected => LifecycleEvent::Rejected(order),
            Self::Expired => LifecycleEvent::Expired(order),
        }
    }
}

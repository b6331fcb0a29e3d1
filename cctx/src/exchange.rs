//! The uniform exchange interface every adapter satisfies, plus the
//! optional capability interfaces an adapter may additionally implement.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::Result;
use crate::models::{Market, MarketId, Order, OrderbookData, OrderId, Position, Side, TokenId};

/// Caller-supplied filter/pagination options, passed through untouched
/// to the adapter's HTTP layer.
pub type Params = HashMap<String, Value>;

/// Capability flags an adapter advertises through [`Exchange::describe`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub slug_resolvable: bool,
    pub orderbook: bool,
    pub market_websocket: bool,
    pub user_websocket: bool,
    pub positions_for_market: bool,
}

/// The surface every exchange adapter implements.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync`: the supervisor and strategy
/// layers call these methods concurrently from multiple tasks.
///
/// # Errors
///
/// Every method returns a typed [`crate::error::Error`] rather than a
/// partial or silently-truncated success value.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Stable identifier for this adapter instance, e.g. `"polymarket"`.
    fn id(&self) -> &'static str;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Capability flags this adapter advertises.
    fn describe(&self) -> Capabilities;

    /// Fetch the current market listing.
    async fn fetch_markets(&self, params: &Params) -> Result<Vec<Market>>;

    /// Fetch a single market by ID.
    async fn fetch_market(&self, id: &MarketId) -> Result<Market>;

    /// Submit a limit order.
    #[allow(clippy::too_many_arguments)]
    async fn create_order(
        &self,
        market_id: &MarketId,
        outcome: &str,
        side: Side,
        price: Decimal,
        size: Decimal,
        params: &Params,
    ) -> Result<Order>;

    /// Cancel an order, optionally scoped to a market for adapters that
    /// need it to disambiguate.
    async fn cancel_order(&self, order_id: &OrderId, market_id: Option<&MarketId>) -> Result<Order>;

    /// Fetch the current state of a single order.
    async fn fetch_order(&self, order_id: &OrderId, market_id: Option<&MarketId>) -> Result<Order>;

    /// Fetch all open orders, optionally scoped to one market.
    async fn fetch_open_orders(
        &self,
        market_id: Option<&MarketId>,
        params: &Params,
    ) -> Result<Vec<Order>>;

    /// Fetch held positions, optionally scoped to one market.
    async fn fetch_positions(&self, market_id: Option<&MarketId>) -> Result<Vec<Position>>;

    /// Fetch the account balance, keyed by asset symbol.
    async fn fetch_balance(&self) -> Result<HashMap<String, Decimal>>;
}

/// Adapters backed by a human-readable URL/slug in addition to a
/// numeric or hex market ID.
#[async_trait]
pub trait SlugResolvable: Send + Sync {
    /// Resolve markets addressed by slug, e.g. from an `/event/{slug}`
    /// URL with the query string stripped and the path walked for the
    /// trailing segment.
    async fn fetch_markets_by_slug(&self, slug: &str) -> Result<Vec<Market>>;
}

/// Adapters that expose a canonical order book for a token.
#[async_trait]
pub trait OrderbookCapable: Send + Sync {
    async fn get_orderbook(&self, token_id: &TokenId) -> Result<OrderbookData>;
}

/// Adapters with a native (or emulated) market-data websocket.
///
/// Returns a lazily constructed subscription handle; see
/// [`crate::orderbook::subscription`].
pub trait MarketWebsocketCapable: Send + Sync {
    fn market_websocket(&self) -> &crate::orderbook::subscription::Subscription;
}

/// Adapters with a native user-event (fill/cancel) websocket.
pub trait UserWebsocketCapable: Send + Sync {
    fn user_websocket(&self) -> &crate::orderbook::subscription::Subscription;
}

/// Adapters that can fetch positions for one market without an extra
/// round trip, because the market is already in hand.
#[async_trait]
pub trait PositionsForMarket: Send + Sync {
    async fn fetch_positions_for_market(&self, market: &Market) -> Result<Vec<Position>>;
}

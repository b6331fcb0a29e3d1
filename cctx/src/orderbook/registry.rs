//! Copy-on-update `tokenID -> snapshot` registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::{OrderbookData, TokenId};

/// Shared registry of the latest known snapshot per token.
///
/// Reads take a read lock; updates replace the `Arc` for one token
/// rather than mutating in place, so readers never observe a torn
/// snapshot.
#[derive(Default)]
pub struct Registry {
    snapshots: RwLock<HashMap<TokenId, Arc<OrderbookData>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, token_id: &TokenId) -> Option<Arc<OrderbookData>> {
        self.snapshots.read().get(token_id).cloned()
    }

    pub fn update(&self, token_id: TokenId, snapshot: OrderbookData) {
        self.snapshots.write().insert(token_id, Arc::new(snapshot));
    }

    #[must_use]
    pub fn subscribed_tokens(&self) -> Vec<TokenId> {
        self.snapshots.read().keys().cloned().collect()
    }

    pub fn remove(&self, token_id: &TokenId) {
        self.snapshots.write().remove(token_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketId;

    fn snapshot(token: &str) -> OrderbookData {
        OrderbookData {
            bids: Vec::new(),
            asks: Vec::new(),
            timestamp_ms: 0,
            asset_id: TokenId::new(token),
            market_id: MarketId::new("m1"),
        }
    }

    #[test]
    fn update_then_get_returns_the_latest_snapshot() {
        let registry = Registry::new();
        registry.update(TokenId::new("t1"), snapshot("t1"));
        assert!(registry.get(&TokenId::new("t1")).is_some());
        assert!(registry.get(&TokenId::new("t2")).is_none());
    }

    #[test]
    fn subscribed_tokens_lists_every_registered_token() {
        let registry = Registry::new();
        registry.update(TokenId::new("t1"), snapshot("t1"));
        registry.update(TokenId::new("t2"), snapshot("t2"));
        let mut tokens: Vec<String> = registry
            .subscribed_tokens()
            .into_iter()
            .map(|t| t.as_str().to_string())
            .collect();
        tokens.sort();
        assert_eq!(tokens, vec!["t1".to_string(), "t2".to_string()]);
    }
}

//! Subscription layer wiring the per-token [`Registry`] to the
//! coalescing [`Publisher`] (for wire/mock feeds) or a plain REST-poll
//! loop (for adapters with no native orderbook websocket), plus the
//! binary "No" price-inversion convention described in spec §9.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::publisher::{Publisher, PublisherConfig};
use super::registry::Registry;
use crate::error::Result;
use crate::models::{OrderbookData, TokenId};

/// Default interval between REST polls for adapters with no native
/// orderbook websocket.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Fetches the current orderbook for one token from an exchange.
/// Implemented by adapters that are `OrderbookCapable`; the subscription
/// layer is agnostic to whether that fetch is a poll or a websocket
/// round trip.
#[async_trait]
pub trait OrderbookSource: Send + Sync {
    async fn fetch(&self, token_id: &TokenId) -> Result<OrderbookData>;
}

/// Callback invoked with every fresh snapshot for a subscribed token.
pub type UpdateCallback = Arc<dyn Fn(&OrderbookData) + Send + Sync>;

/// The subscription contract adapters expose through
/// `MarketWebsocketCapable` / `UserWebsocketCapable`: `subscribe`,
/// `connect`, `disconnect`, backed by a shared snapshot [`Registry`].
pub struct Subscription {
    registry: Registry,
    publisher: Arc<Publisher>,
    callbacks: Mutex<Vec<UpdateCallback>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    poll_cancel: Mutex<CancellationToken>,
}

impl Subscription {
    #[must_use]
    pub fn new(config: PublisherConfig) -> Arc<Self> {
        Arc::new(Self {
            registry: Registry::new(),
            publisher: Publisher::new(config),
            callbacks: Mutex::new(Vec::new()),
            poll_task: Mutex::new(None),
            poll_cancel: Mutex::new(CancellationToken::new()),
        })
    }

    /// Latest known snapshot for `token_id`, if one has been published.
    #[must_use]
    pub fn snapshot(&self, token_id: &TokenId) -> Option<Arc<OrderbookData>> {
        self.registry.get(token_id)
    }

    /// Register interest in a token and a callback fired on every
    /// update. Requests an immediate publish so a late subscriber sees a
    /// fresh snapshot without waiting for the next heartbeat.
    pub fn subscribe(&self, token_id: TokenId, callback: UpdateCallback) {
        self.callbacks.lock().push(callback);
        self.publisher.request(token_id);
    }

    fn notify(&self, book: &OrderbookData) {
        for callback in self.callbacks.lock().iter() {
            callback(book);
        }
    }

    /// Idempotently start the push-model publisher: on each coalesced
    /// tick or heartbeat, `source.fetch` runs for every pending token
    /// and the registry and callbacks are updated with the result.
    pub fn connect_push(self: &Arc<Self>, source: Arc<dyn OrderbookSource>) {
        let publish_subscription = self.clone();
        let heartbeat_subscription = self.clone();
        self.publisher.connect(
            move |token_id| {
                let subscription = publish_subscription.clone();
                let source = source.clone();
                let token_id = token_id.clone();
                tokio::spawn(async move {
                    subscription.fetch_and_publish(source.as_ref(), token_id).await;
                });
            },
            move || heartbeat_subscription.registry.subscribed_tokens(),
        );
    }

    /// Idempotently start the REST-poll loop used by adapters without a
    /// native orderbook websocket: calls `source.fetch` for every
    /// subscribed token every `poll_interval`.
    pub fn connect_poll(self: &Arc<Self>, source: Arc<dyn OrderbookSource>, poll_interval: Duration) {
        let mut task_slot = self.poll_task.lock();
        if task_slot.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        *self.poll_cancel.lock() = cancel.clone();

        let subscription = self.clone();
        *task_slot = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(poll_interval) => {}
                }
                for token_id in subscription.registry.subscribed_tokens() {
                    subscription.fetch_and_publish(source.as_ref(), token_id).await;
                }
            }
        }));
    }

    async fn fetch_and_publish(&self, source: &dyn OrderbookSource, token_id: TokenId) {
        match source.fetch(&token_id).await {
            Ok(book) => {
                self.registry.update(token_id, book.clone());
                self.notify(&book);
            }
            Err(err) => {
                debug!(%token_id, error = %err, "orderbook fetch failed, keeping stale snapshot");
            }
        }
    }

    /// Derive and publish the complementary ("No") side of a binary
    /// market's book by price inversion (`p -> 1 - p`) and side swap
    /// (spec §9), storing the result under `no_token` and firing
    /// callbacks for it. A no-op if `yes_token` has no snapshot yet.
    pub fn publish_complementary(&self, yes_token: &TokenId, no_token: TokenId) {
        let Some(yes_book) = self.registry.get(yes_token) else {
            warn!(%yes_token, "cannot derive complementary book: no snapshot yet");
            return;
        };
        let no_book = yes_book.invert_for_complementary_outcome(no_token.clone());
        self.registry.update(no_token, no_book.clone());
        self.notify(&no_book);
    }

    /// Idempotently stop the publisher and REST-poll loop, cancelling
    /// every subscription context.
    pub fn disconnect(&self) {
        self.publisher.disconnect();
        self.poll_cancel.lock().cancel();
        if let Some(task) = self.poll_task.lock().take() {
            task.abort();
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.publisher.is_connected() || self.poll_task.lock().is_some()
    }
}

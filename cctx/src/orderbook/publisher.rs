//! Coalescing publisher: drains pending token-publish requests on a
//! tick, applies simulated latency + jitter, and republishes a
//! heartbeat snapshot when nothing else has happened recently.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::models::TokenId;

/// Default bounded capacity of the pending-publish queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// How the queue behaves once it reaches capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Reject the new request, keeping what's already queued. Fits the
    /// poll/mock model, where a dropped coalescing hint is recovered by
    /// the next poll tick anyway.
    DropNewest,
    /// Evict the oldest queued request to make room. Fits wire adapters
    /// where freshness of the latest update matters more than not
    /// missing one.
    DropOldest,
}

/// Tunables for one publisher instance.
#[derive(Debug, Clone, Copy)]
pub struct PublisherConfig {
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub base_latency: Duration,
    pub jitter: Duration,
    pub heartbeat_interval: Duration,
    pub tick_interval: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::DropNewest,
            base_latency: Duration::from_millis(0),
            jitter: Duration::from_millis(0),
            heartbeat_interval: Duration::from_secs(1),
            tick_interval: Duration::from_millis(50),
        }
    }
}

struct PendingQueue {
    items: VecDeque<TokenId>,
    capacity: usize,
    policy: OverflowPolicy,
}

impl PendingQueue {
    fn push(&mut self, token_id: TokenId) {
        if self.items.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::DropNewest => return,
                OverflowPolicy::DropOldest => {
                    self.items.pop_front();
                }
            }
        }
        self.items.push_back(token_id);
    }

    fn drain_unique(&mut self) -> Vec<TokenId> {
        let mut seen = std::collections::HashSet::new();
        let mut unique = Vec::new();
        for token in self.items.drain(..) {
            if seen.insert(token.clone()) {
                unique.push(token);
            }
        }
        unique
    }
}

/// Runs the coalescing publish loop until [`Publisher::disconnect`] or
/// the supplied cancellation token fires.
pub struct Publisher {
    config: PublisherConfig,
    pending: Mutex<PendingQueue>,
    notify: Notify,
    cancel: Mutex<CancellationToken>,
    connected: std::sync::atomic::AtomicBool,
}

impl Publisher {
    #[must_use]
    pub fn new(config: PublisherConfig) -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(PendingQueue {
                items: VecDeque::with_capacity(config.queue_capacity),
                capacity: config.queue_capacity,
                policy: config.overflow_policy,
            }),
            config,
            notify: Notify::new(),
            cancel: Mutex::new(CancellationToken::new()),
            connected: std::sync::atomic::AtomicBool::new(false),
        })
    }

    /// Request that `token_id` be (re-)published on the next tick.
    /// Non-blocking; subject to the configured [`OverflowPolicy`].
    pub fn request(&self, token_id: TokenId) {
        self.pending.lock().push(token_id);
        self.notify.notify_one();
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Idempotently start the publish loop, calling `publish_one` for
    /// every token that should be (re-)published, and `subscribed`
    /// to enumerate tokens for heartbeat snapshots.
    pub fn connect<F, S>(self: &Arc<Self>, mut publish_one: F, subscribed: S)
    where
        F: FnMut(&TokenId) + Send + 'static,
        S: Fn() -> Vec<TokenId> + Send + 'static,
    {
        if self.connected.swap(true, std::sync::atomic::Ordering::AcqRel) {
            return;
        }
        // A prior disconnect() cancelled the token stored here; mint a
        // fresh one so this connect cycle isn't born already-cancelled.
        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();

        let publisher = self.clone();
        tokio::spawn(async move {
            let mut last_heartbeat = tokio::time::Instant::now();
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(publisher.config.tick_interval) => {},
                    () = publisher.notify.notified() => {},
                }

                let pending = publisher.pending.lock().drain_unique();
                if pending.is_empty() {
                    if last_heartbeat.elapsed() >= publisher.config.heartbeat_interval {
                        trace!("publisher heartbeat: republishing all subscribed tokens");
                        for token in subscribed() {
                            publisher.sleep_with_jitter().await;
                            publish_one(&token);
                        }
                        last_heartbeat = tokio::time::Instant::now();
                    }
                    continue;
                }

                for token in pending {
                    publisher.sleep_with_jitter().await;
                    publish_one(&token);
                }
                last_heartbeat = tokio::time::Instant::now();
            }
        });
    }

    async fn sleep_with_jitter(&self) {
        let jitter_ms = if self.config.jitter.is_zero() {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.config.jitter.as_millis() as u64)
        };
        let delay = self.config.base_latency + Duration::from_millis(jitter_ms);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Idempotently stop the publish loop and cancel all subscription
    /// contexts.
    pub fn disconnect(&self) {
        if self.connected.swap(false, std::sync::atomic::Ordering::AcqRel) {
            self.cancel.lock().cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    #[test]
    fn drop_newest_keeps_the_earliest_requests_on_overflow() {
        let mut queue = PendingQueue {
            items: VecDeque::new(),
            capacity: 2,
            policy: OverflowPolicy::DropNewest,
        };
        queue.push(TokenId::new("a"));
        queue.push(TokenId::new("b"));
        queue.push(TokenId::new("c"));
        let drained = queue.drain_unique();
        assert_eq!(drained, vec![TokenId::new("a"), TokenId::new("b")]);
    }

    #[test]
    fn drop_oldest_keeps_the_latest_requests_on_overflow() {
        let mut queue = PendingQueue {
            items: VecDeque::new(),
            capacity: 2,
            policy: OverflowPolicy::DropOldest,
        };
        queue.push(TokenId::new("a"));
        queue.push(TokenId::new("b"));
        queue.push(TokenId::new("c"));
        let drained = queue.drain_unique();
        assert_eq!(drained, vec![TokenId::new("b"), TokenId::new("c")]);
    }

    #[test]
    fn drain_unique_deduplicates_repeated_tokens() {
        let mut queue = PendingQueue {
            items: VecDeque::new(),
            capacity: 10,
            policy: OverflowPolicy::DropNewest,
        };
        queue.push(TokenId::new("a"));
        queue.push(TokenId::new("a"));
        queue.push(TokenId::new("b"));
        assert_eq!(queue.drain_unique(), vec![TokenId::new("a"), TokenId::new("b")]);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_publishes_requested_tokens_and_disconnect_stops_it() {
        let publisher = Publisher::new(PublisherConfig {
            tick_interval: StdDuration::from_millis(5),
            heartbeat_interval: StdDuration::from_secs(3600),
            ..Default::default()
        });

        let published = Arc::new(AtomicUsize::new(0));
        let published_clone = published.clone();
        publisher.connect(
            move |_token| {
                published_clone.fetch_add(1, Ordering::SeqCst);
            },
            || Vec::new(),
        );

        publisher.request(TokenId::new("t1"));
        tokio::time::advance(StdDuration::from_millis(20)).await;
        tokio::task::yield_now().await;

        assert_eq!(published.load(Ordering::SeqCst), 1);

        publisher.disconnect();
        assert!(!publisher.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_after_disconnect_publishes_again() {
        let publisher = Publisher::new(PublisherConfig {
            tick_interval: StdDuration::from_millis(5),
            heartbeat_interval: StdDuration::from_secs(3600),
            ..Default::default()
        });

        let published = Arc::new(AtomicUsize::new(0));

        let first_count = published.clone();
        publisher.connect(
            move |_token| {
                first_count.fetch_add(1, Ordering::SeqCst);
            },
            || Vec::new(),
        );
        publisher.request(TokenId::new("t1"));
        tokio::time::advance(StdDuration::from_millis(20)).await;
        tokio::task::yield_now().await;
        assert_eq!(published.load(Ordering::SeqCst), 1);

        publisher.disconnect();
        assert!(!publisher.is_connected());

        let second_count = published.clone();
        publisher.connect(
            move |_token| {
                second_count.fetch_add(1, Ordering::SeqCst);
            },
            || Vec::new(),
        );
        publisher.request(TokenId::new("t2"));
        tokio::time::advance(StdDuration::from_millis(20)).await;
        tokio::task::yield_now().await;

        assert_eq!(published.load(Ordering::SeqCst), 2);
        publisher.disconnect();
    }
}

//! In-process publish/subscribe feeds.
//!
//! A [`Feed`] fans an event out to every current subscriber without
//! blocking the publisher: each subscriber owns a bounded buffer and a
//! subscriber that has fallen behind simply misses the event. Sends on one
//! feed are FIFO with respect to each other; there is no ordering guarantee
//! across feeds.
//!
//! [`SubscriptionScope`] bundles subscriptions so a component can release
//! everything it holds in one call during teardown.

use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Weak,
};
use tokio::sync::mpsc;
use tracing::trace;

/// Per-subscriber buffer depth. A subscriber this far behind starts
/// dropping events rather than stalling the publisher.
const SUBSCRIBER_BUFFER: usize = 256;

struct FeedSubscriber<T> {
    id: u64,
    tx: mpsc::Sender<T>,
}

struct FeedInner<T> {
    subscribers: Mutex<Vec<FeedSubscriber<T>>>,
    next_id: AtomicU64,
}

impl<T> FeedInner<T> {
    fn remove(&self, id: u64) {
        self.subscribers.lock().retain(|sub| sub.id != id);
    }
}

/// Multi-subscriber event feed for a single concrete event type.
pub struct Feed<T> {
    inner: Arc<FeedInner<T>>,
}

impl<T> Clone for Feed<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: Clone + Send + 'static> Default for Feed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Feed<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FeedInner {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Registers a new subscriber and returns its receiving handle.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.inner.subscribers.lock().push(FeedSubscriber { id, tx });
        Subscription { id, rx, feed: Arc::downgrade(&self.inner) }
    }

    /// Delivers `event` to every current subscriber and returns how many
    /// received it. Subscribers with full buffers are skipped; subscribers
    /// whose receiving half is gone are pruned.
    pub fn send(&self, event: &T) -> usize {
        let mut subscribers = self.inner.subscribers.lock();
        let mut delivered = 0;

        subscribers.retain(|sub| match sub.tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!(subscriber = sub.id, "feed subscriber buffer full, event dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });

        delivered
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// Receiving half of a feed subscription. Dropping it unsubscribes.
pub struct Subscription<T> {
    id: u64,
    rx: mpsc::Receiver<T>,
    feed: Weak<FeedInner<T>>,
}

impl<T: Send + 'static> Subscription<T> {
    /// Waits for the next event. Returns `None` once unsubscribed with no
    /// buffered events remaining.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Non-blocking poll of the subscription buffer.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Explicitly detaches from the feed. Equivalent to dropping the
    /// subscription.
    pub fn unsubscribe(self) {}

    /// A detachable cancel handle usable from a [`SubscriptionScope`].
    #[must_use]
    pub fn canceller(&self) -> SubscriptionCanceller {
        let feed = self.feed.clone();
        let id = self.id;
        SubscriptionCanceller {
            cancel: Arc::new(move || {
                if let Some(inner) = feed.upgrade() {
                    inner.remove(id);
                }
            }),
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.feed.upgrade() {
            inner.remove(self.id);
        }
    }
}

/// Type-erased handle that detaches one subscription from its feed.
#[derive(Clone)]
pub struct SubscriptionCanceller {
    cancel: Arc<dyn Fn() + Send + Sync>,
}

impl SubscriptionCanceller {
    pub fn cancel(&self) {
        (self.cancel)();
    }
}

/// Bundles subscriptions across feeds of different event types so they can
/// all be released at once.
#[derive(Default)]
pub struct SubscriptionScope {
    cancellers: Mutex<Vec<SubscriptionCanceller>>,
    closed: AtomicBool,
}

impl SubscriptionScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `subscription` for bulk release. Tracking after
    /// [`close_all`](Self::close_all) cancels immediately.
    pub fn track<T: Send + 'static>(&self, subscription: &Subscription<T>) {
        let canceller = subscription.canceller();
        if self.closed.load(Ordering::Acquire) {
            canceller.cancel();
            return;
        }
        self.cancellers.lock().push(canceller);
    }

    /// Detaches every tracked subscription. Idempotent.
    pub fn close_all(&self) {
        self.closed.store(true, Ordering::Release);
        let cancellers = std::mem::take(&mut *self.cancellers.lock());
        for canceller in cancellers {
            canceller.cancel();
        }
    }
}

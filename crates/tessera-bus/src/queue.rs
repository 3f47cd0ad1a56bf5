use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tessera_core::{observe, BusConfig, OverflowPolicy};

use crate::error::{BusError, Result};
use crate::feed::{self, Delivery, Feed, FeedSender};
use crate::filter::Matcher;

struct Subscriber<T> {
    matcher: Option<Matcher<T>>,
    sender: FeedSender<T>,
}

struct Inner<T> {
    subscribers: RwLock<HashMap<u64, Subscriber<T>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    overflow: OverflowPolicy,
}

impl<T> Inner<T> {
    fn remove(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers.write();
        let removed = subscribers.remove(&id).is_some();
        observe::set_subscriber_count(subscribers.len());
        removed
    }
}

/// Broadcast queue with per-subscriber predicate filtering
///
/// Every subscriber owns a private [`Feed`]; publishing hands each matching
/// subscriber a clone of the event and never waits on a slow consumer.
/// Cloning the queue yields another handle to the same subscriber registry.
pub struct WatchQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for WatchQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Default for WatchQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for WatchQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchQueue")
            .field("subscribers", &self.inner.subscribers.read().len())
            .field("closed", &self.inner.closed.load(Ordering::Acquire))
            .field("overflow", &self.inner.overflow)
            .finish()
    }
}

impl<T: Clone + Send + 'static> WatchQueue<T> {
    /// Create a queue with unbounded feeds
    pub fn new() -> Self {
        Self::with_config(&BusConfig::default())
    }

    pub fn with_config(config: &BusConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                overflow: config.overflow,
            }),
        }
    }

    /// Subscribe to every event
    pub fn watch(&self) -> Result<(Feed<T>, CancelHandle)> {
        self.subscribe(None)
    }

    /// Subscribe to events accepted by `matcher`
    pub fn callback_watch<F>(&self, matcher: F) -> Result<(Feed<T>, CancelHandle)>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.subscribe(Some(Arc::new(matcher)))
    }

    /// Subscribe with an optional prebuilt matcher; `None` accepts everything.
    pub fn subscribe(&self, matcher: Option<Matcher<T>>) -> Result<(Feed<T>, CancelHandle)> {
        let (sender, feed) = feed::channel(self.inner.overflow.capacity());
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut subscribers = self.inner.subscribers.write();
            // Checked under the registry lock so close() cannot miss this entry
            if self.inner.closed.load(Ordering::Acquire) {
                return Err(BusError::Closed);
            }
            subscribers.insert(id, Subscriber { matcher, sender });
            observe::set_subscriber_count(subscribers.len());
        }
        tracing::trace!(subscriber = id, "watch registered");
        Ok((feed, CancelHandle::new(Arc::downgrade(&self.inner), id)))
    }

    /// Broadcast an event to every matching subscriber
    ///
    /// Returns the number of feeds the event was queued on. Subscribers whose
    /// feed has been dropped are removed, as are overflowing subscribers under
    /// [`OverflowPolicy::CloseOnFull`].
    pub fn publish(&self, event: T) -> usize {
        if self.inner.closed.load(Ordering::Acquire) {
            return 0;
        }

        let mut delivered = 0;
        let mut dropped = 0;
        let mut evict = Vec::new();
        {
            let subscribers = self.inner.subscribers.read();
            for (id, subscriber) in subscribers.iter() {
                if let Some(matcher) = &subscriber.matcher {
                    if !matcher(&event) {
                        continue;
                    }
                }
                match subscriber.sender.deliver(event.clone()) {
                    Delivery::Sent => delivered += 1,
                    Delivery::Disconnected => evict.push(*id),
                    Delivery::Full => {
                        dropped += 1;
                        if let OverflowPolicy::CloseOnFull { .. } = self.inner.overflow {
                            tracing::warn!(subscriber = id, "watch feed full, closing subscription");
                            evict.push(*id);
                        }
                    }
                }
            }
        }

        if !evict.is_empty() {
            let mut subscribers = self.inner.subscribers.write();
            for id in evict {
                subscribers.remove(&id);
            }
            observe::set_subscriber_count(subscribers.len());
        }
        observe::record_publish(delivered, dropped);
        delivered
    }

    /// Stop accepting subscriptions and end every feed
    ///
    /// Feeds still deliver what was queued before the close, then report
    /// end-of-stream. Idempotent.
    pub fn close(&self) {
        let mut subscribers = self.inner.subscribers.write();
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let count = subscribers.len();
        subscribers.clear();
        observe::set_subscriber_count(0);
        tracing::debug!(subscribers = count, "watch queue closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

/// Releases a subscription when cancelled or dropped.
///
/// Cancelling ends the matching [`Feed`]: it drains what was already queued
/// and then reports end-of-stream. Use [`detach`](CancelHandle::detach) to
/// keep a subscription alive for the lifetime of the queue.
#[must_use = "dropping a CancelHandle cancels its subscription"]
pub struct CancelHandle {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CancelHandle {
    fn new<T: 'static>(inner: Weak<Inner<T>>, id: u64) -> Self
    where
        Inner<T>: Send + Sync,
    {
        Self {
            cancel: Some(Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    if inner.remove(id) {
                        tracing::trace!(subscriber = id, "watch cancelled");
                    }
                }
            })),
        }
    }

    /// Release the subscription now
    pub fn cancel(mut self) {
        self.run();
    }

    /// Give up the ability to cancel; the subscription lives until the
    /// queue closes or its feed is dropped.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn run(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfiltered_watch_sees_everything_in_order() {
        let queue = WatchQueue::new();
        let (mut feed, _cancel) = queue.watch().unwrap();

        for i in 0..5 {
            assert_eq!(queue.publish(i), 1);
        }
        assert_eq!(feed.drain(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_callback_watch_filters() {
        let queue = WatchQueue::new();
        let (mut evens, _a) = queue.callback_watch(|n: &i32| n % 2 == 0).unwrap();
        let (mut all, _b) = queue.watch().unwrap();

        for i in 0..4 {
            queue.publish(i);
        }
        assert_eq!(evens.drain(), vec![0, 2]);
        assert_eq!(all.drain(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_cancel_ends_feed() {
        let queue = WatchQueue::new();
        let (mut feed, cancel) = queue.watch().unwrap();
        queue.publish(1);
        cancel.cancel();
        queue.publish(2);

        assert_eq!(queue.subscriber_count(), 0);
        assert_eq!(feed.blocking_recv(), Some(1));
        assert_eq!(feed.blocking_recv(), None);
    }

    #[test]
    fn test_drop_cancels() {
        let queue = WatchQueue::<u8>::new();
        {
            let (_feed, _cancel) = queue.watch().unwrap();
            assert_eq!(queue.subscriber_count(), 1);
        }
        assert_eq!(queue.subscriber_count(), 0);
    }

    #[test]
    fn test_detach_keeps_subscription() {
        let queue = WatchQueue::new();
        let (mut feed, cancel) = queue.watch().unwrap();
        cancel.detach();
        queue.publish("kept");
        assert_eq!(queue.subscriber_count(), 1);
        assert_eq!(feed.try_recv(), Some("kept"));
    }

    #[test]
    fn test_dropped_feed_is_evicted_on_publish() {
        let queue = WatchQueue::new();
        let (feed, cancel) = queue.watch().unwrap();
        cancel.detach();
        drop(feed);

        assert_eq!(queue.publish(7), 0);
        assert_eq!(queue.subscriber_count(), 0);
    }

    #[test]
    fn test_close_on_full_evicts_slow_subscriber() {
        let queue = WatchQueue::with_config(
            &BusConfig::default().with_overflow(OverflowPolicy::CloseOnFull { capacity: 2 }),
        );
        let (mut feed, _cancel) = queue.watch().unwrap();

        for i in 0..4 {
            queue.publish(i);
        }
        assert_eq!(queue.subscriber_count(), 0);
        assert_eq!(feed.blocking_recv(), Some(0));
        assert_eq!(feed.blocking_recv(), Some(1));
        assert_eq!(feed.blocking_recv(), None);
    }

    #[test]
    fn test_drop_on_full_keeps_subscriber() {
        let queue = WatchQueue::with_config(
            &BusConfig::default().with_overflow(OverflowPolicy::DropOnFull { capacity: 2 }),
        );
        let (mut feed, _cancel) = queue.watch().unwrap();

        for i in 0..4 {
            queue.publish(i);
        }
        assert_eq!(queue.subscriber_count(), 1);
        assert_eq!(feed.drain(), vec![0, 1]);

        queue.publish(9);
        assert_eq!(feed.try_recv(), Some(9));
    }

    #[test]
    fn test_close_rejects_watchers_and_ends_feeds() {
        let queue = WatchQueue::new();
        let (mut feed, _cancel) = queue.watch().unwrap();
        queue.publish(1);
        queue.close();
        queue.close();

        assert!(queue.is_closed());
        assert_eq!(queue.publish(2), 0);
        assert!(matches!(queue.watch(), Err(BusError::Closed)));
        assert_eq!(feed.blocking_recv(), Some(1));
        assert_eq!(feed.blocking_recv(), None);
    }

    #[tokio::test]
    async fn test_async_recv_across_threads() {
        let queue = WatchQueue::new();
        let (mut feed, _cancel) = queue.watch().unwrap();

        let publisher = queue.clone();
        std::thread::spawn(move || {
            for i in 0..3u32 {
                publisher.publish(i);
            }
            publisher.close();
        });

        let mut seen = Vec::new();
        while let Some(n) = feed.recv().await {
            seen.push(n);
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }
}

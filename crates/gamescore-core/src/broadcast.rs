//! Named-channel publish/subscribe used to fan out live updates
//!
//! A channel exists only while it has at least one subscriber. Handlers are
//! invoked synchronously by [`ChannelBroadcaster::publish`]; a handler that
//! fails or panics is skipped so the remaining subscribers still receive the
//! message. There is no buffering: publishing to an absent channel drops the
//! message.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use thiserror::Error;

/// Why a handler could not take a message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber is closed")]
    Closed,

    #[error("subscriber rejected message: {0}")]
    Rejected(String),
}

type Handler<T> = Arc<dyn Fn(&T) -> Result<(), DeliveryError> + Send + Sync>;

struct Registry<T> {
    channels: Mutex<HashMap<String, HashMap<u64, Handler<T>>>>,
    next_id: AtomicU64,
}

impl<T> Registry<T> {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, HashMap<u64, Handler<T>>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, channel: &str, id: u64) {
        let mut channels = self.lock();
        if let Some(handlers) = channels.get_mut(channel) {
            handlers.remove(&id);
            if handlers.is_empty() {
                channels.remove(channel);
            }
        }
    }
}

/// Process-local channel registry. Clones share the same registry.
pub struct ChannelBroadcaster<T> {
    registry: Arc<Registry<T>>,
}

impl<T> Clone for ChannelBroadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<T> Default for ChannelBroadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChannelBroadcaster<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                channels: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register `handler` on `channel`. The handler stays registered until the
    /// returned [`Subscription`] is unsubscribed or dropped.
    pub fn subscribe<F>(&self, channel: impl Into<String>, handler: F) -> Subscription<T>
    where
        F: Fn(&T) -> Result<(), DeliveryError> + Send + Sync + 'static,
    {
        let channel = channel.into();
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);

        self.registry
            .lock()
            .entry(channel.clone())
            .or_default()
            .insert(id, Arc::new(handler));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            channel,
            id,
            active: true,
        }
    }

    /// Deliver `data` to every handler currently on `channel`.
    ///
    /// Returns how many handlers accepted the message.
    pub fn publish(&self, channel: &str, data: &T) -> usize {
        // Snapshot so handlers run without the registry lock held
        let handlers: Vec<Handler<T>> = match self.registry.lock().get(channel) {
            Some(handlers) => handlers.values().cloned().collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for handler in &handlers {
            // Caught panics still reach the process panic hook, if one is set
            if let Ok(Ok(())) = catch_unwind(AssertUnwindSafe(|| handler(data))) {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn has_subscribers(&self, channel: &str) -> bool {
        self.subscriber_count(channel) > 0
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.registry
            .lock()
            .get(channel)
            .map(|handlers| handlers.len())
            .unwrap_or(0)
    }

    /// Number of channels with at least one subscriber
    pub fn channel_count(&self) -> usize {
        self.registry.lock().len()
    }
}

/// Handle for one registered handler. Dropping it unsubscribes.
pub struct Subscription<T> {
    registry: Weak<Registry<T>>,
    channel: String,
    id: u64,
    active: bool,
}

impl<T> Subscription<T> {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.channel, self.id);
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&i32) -> Result<(), DeliveryError>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler_count = count.clone();
        (count, move |_: &i32| {
            handler_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_publish_invokes_handler_once() {
        let broadcaster = ChannelBroadcaster::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();

        let _sub = broadcaster.subscribe("event:1", move |value: &i32| {
            sink.lock().unwrap().push(*value);
            Ok(())
        });

        assert_eq!(broadcaster.publish("event:1", &5), 1);
        assert_eq!(*received.lock().unwrap(), vec![5]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let broadcaster = ChannelBroadcaster::new();
        let (count, handler) = counter();

        let sub = broadcaster.subscribe("event:1", handler);
        broadcaster.publish("event:1", &1);
        sub.unsubscribe();
        broadcaster.publish("event:1", &2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let broadcaster = ChannelBroadcaster::new();
        let (count, handler) = counter();

        {
            let _sub = broadcaster.subscribe("event:1", handler);
            assert!(broadcaster.has_subscribers("event:1"));
        }

        assert!(!broadcaster.has_subscribers("event:1"));
        assert_eq!(broadcaster.publish("event:1", &1), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failing_handlers_do_not_block_others() {
        let broadcaster = ChannelBroadcaster::new();
        let (count, handler) = counter();

        let _closed = broadcaster.subscribe("event:1", |_: &i32| Err(DeliveryError::Closed));
        let _panics = broadcaster.subscribe("event:1", |_: &i32| -> Result<(), DeliveryError> {
            panic!("handler blew up")
        });
        let _ok = broadcaster.subscribe("event:1", handler);

        assert_eq!(broadcaster.publish("event:1", &1), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // The panicking handler stays registered and keeps being skipped
        assert_eq!(broadcaster.subscriber_count("event:1"), 3);
        assert_eq!(broadcaster.publish("event:1", &2), 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_channel_lifecycle() {
        let broadcaster: ChannelBroadcaster<i32> = ChannelBroadcaster::new();
        assert_eq!(broadcaster.channel_count(), 0);

        let first = broadcaster.subscribe("event:1", |_| Ok(()));
        let second = broadcaster.subscribe("event:1", |_| Ok(()));
        let other = broadcaster.subscribe("event:2", |_| Ok(()));
        assert_eq!(broadcaster.channel_count(), 2);
        assert_eq!(broadcaster.subscriber_count("event:1"), 2);

        first.unsubscribe();
        assert!(broadcaster.has_subscribers("event:1"));

        second.unsubscribe();
        assert!(!broadcaster.has_subscribers("event:1"));
        assert_eq!(broadcaster.channel_count(), 1);

        drop(other);
        assert_eq!(broadcaster.channel_count(), 0);
    }

    #[test]
    fn test_channels_are_isolated() {
        let broadcaster = ChannelBroadcaster::new();
        let (count, handler) = counter();
        let _sub = broadcaster.subscribe("event:1", handler);

        assert_eq!(broadcaster.publish("event:2", &1), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_may_subscribe_during_publish() {
        let broadcaster: ChannelBroadcaster<i32> = ChannelBroadcaster::new();
        let inner = broadcaster.clone();
        let spawned = Arc::new(Mutex::new(Vec::new()));
        let spawned_sink = spawned.clone();

        let _sub = broadcaster.subscribe("event:1", move |_| {
            let sub = inner.subscribe("event:1", |_| Ok(()));
            spawned_sink.lock().unwrap().push(sub);
            Ok(())
        });

        assert_eq!(broadcaster.publish("event:1", &1), 1);
        assert_eq!(broadcaster.subscriber_count("event:1"), 2);
    }

    #[test]
    fn test_subscription_outliving_broadcaster() {
        let broadcaster: ChannelBroadcaster<i32> = ChannelBroadcaster::new();
        let sub = broadcaster.subscribe("event:1", |_| Ok(()));
        drop(broadcaster);
        sub.unsubscribe();
    }
}

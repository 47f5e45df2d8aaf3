//! Live event updates
//!
//! Bridges the synchronous broadcaster to async consumers: each subscriber
//! gets an unbounded channel that its stream drains.

use gamescore_core::{ChannelBroadcaster, DeliveryError, StreamMessage, Subscription};
use tokio::sync::mpsc;
use tracing::debug;

pub type LiveUpdates = ChannelBroadcaster<StreamMessage>;

pub fn event_channel(event_id: &str) -> String {
    format!("event:{}", event_id)
}

/// Publish `message` to everyone watching `event_id`
pub fn publish(live: &LiveUpdates, event_id: &str, message: &StreamMessage) -> usize {
    let delivered = live.publish(&event_channel(event_id), message);
    debug!("Published to event:{} ({} listeners)", event_id, delivered);
    delivered
}

/// Subscribe to `event_id`. Messages arrive on the receiver until the
/// subscription is dropped.
pub fn subscribe_event(
    live: &LiveUpdates,
    event_id: &str,
) -> (
    mpsc::UnboundedReceiver<StreamMessage>,
    Subscription<StreamMessage>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = live.subscribe(event_channel(event_id), move |message: &StreamMessage| {
        tx.send(message.clone()).map_err(|_| DeliveryError::Closed)
    });
    (rx, subscription)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_published_messages() {
        let live = LiveUpdates::new();
        let (mut rx, subscription) = subscribe_event(&live, "evt-1");

        let message = StreamMessage::Connected {
            event_id: "evt-1".to_string(),
        };
        assert_eq!(publish(&live, "evt-1", &message), 1);
        assert_eq!(rx.recv().await, Some(message));

        drop(subscription);
        assert!(!live.has_subscribers(&event_channel("evt-1")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_closed_receiver_counts_as_undelivered() {
        let live = LiveUpdates::new();
        let (rx, _subscription) = subscribe_event(&live, "evt-1");
        drop(rx);

        let message = StreamMessage::Connected {
            event_id: "evt-1".to_string(),
        };
        assert_eq!(publish(&live, "evt-1", &message), 0);
    }
}

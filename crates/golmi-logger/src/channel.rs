//! In-process named-event channel.
//!
//! [`EventChannel`] stands in for the client/server connection: whatever
//! transport the bootstrap uses (NATS, a socket, a test) emits named JSON
//! events into it, and every subscriber sees them in delivery order.
//!
//! Each subscription owns an unbounded queue, so a subscriber that falls
//! behind never loses events; it only sees them later.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use golmi_types::{ChannelEvent, EventKind};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

type Senders = Vec<mpsc::UnboundedSender<ChannelEvent>>;

/// Push-style fan-out of named events.
///
/// Clones share the same subscriber list. Subscriptions end once every
/// clone has been dropped.
#[derive(Debug, Clone, Default)]
pub struct EventChannel {
    subscribers: Arc<Mutex<Senders>>,
}

impl EventChannel {
    /// Create a channel with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, Senders> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received it; zero is not an
    /// error.
    pub fn emit(&self, name: impl Into<String>, payload: Value) -> usize {
        self.send(ChannelEvent::new(name, payload))
    }

    /// Deliver one of the logger's event kinds.
    pub fn emit_kind(&self, kind: EventKind, payload: Value) -> usize {
        self.send(ChannelEvent::of_kind(kind, payload))
    }

    /// Deliver a prebuilt event.
    ///
    /// Subscriptions that have been dropped are pruned here.
    pub fn send(&self, event: ChannelEvent) -> usize {
        let mut subscribers = self.subscribers();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        trace!(event = %event.name, receivers = subscribers.len(), "event delivered");
        subscribers.len()
    }

    /// Subscribe to a set of event kinds.
    ///
    /// Events with other names are dropped by the subscription.
    pub fn subscribe(&self, kinds: &[EventKind]) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers().push(tx);
        Subscription {
            rx,
            kinds: kinds.iter().copied().collect(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

/// Receiving end filtered to a set of event kinds.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<ChannelEvent>,
    kinds: BTreeSet<EventKind>,
}

impl Subscription {
    /// Wait for the next subscribed event.
    ///
    /// Returns `None` once every [`EventChannel`] handle has been dropped
    /// and the queue is drained.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        while let Some(event) = self.rx.recv().await {
            if event.kind().is_some_and(|kind| self.kinds.contains(&kind)) {
                return Some(event);
            }
            debug!(event = %event.name, "skipping unsubscribed event");
        }
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn subscription_filters_by_kind() {
        let channel = EventChannel::new();
        let mut sub = channel.subscribe(&[EventKind::Objs]);

        channel.emit("attach_gripper", json!("sid"));
        channel.emit_kind(EventKind::Grippers, json!({"g": 1}));
        channel.emit_kind(EventKind::Objs, json!({"o": 1}));

        let event = sub.recv().await.unwrap();
        assert_eq!(event.kind(), Some(EventKind::Objs));
        assert_eq!(event.payload, json!({"o": 1}));
    }

    #[tokio::test]
    async fn events_arrive_in_delivery_order() {
        let channel = EventChannel::new();
        let mut sub = channel.subscribe(&EventKind::ALL);

        channel.emit_kind(EventKind::Config, json!(1));
        channel.emit_kind(EventKind::State, json!(2));
        channel.emit_kind(EventKind::Grippers, json!(3));

        let mut seen = Vec::new();
        for _ in 0..3 {
            let event = sub.recv().await.unwrap();
            seen.push((event.kind().unwrap(), event.payload));
        }
        assert_eq!(
            seen,
            vec![
                (EventKind::Config, json!(1)),
                (EventKind::State, json!(2)),
                (EventKind::Grippers, json!(3)),
            ]
        );
    }

    #[tokio::test]
    async fn closed_channel_ends_subscription() {
        let channel = EventChannel::new();
        let mut sub = channel.subscribe(&EventKind::ALL);
        let clone = channel.clone();
        drop(channel);
        clone.emit_kind(EventKind::Objs, json!(1));
        drop(clone);
        assert!(sub.recv().await.is_some());
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn slow_subscriber_loses_nothing() {
        let channel = EventChannel::new();
        let mut sub = channel.subscribe(&EventKind::ALL);
        for i in 0..5000 {
            channel.emit_kind(EventKind::Objs, json!(i));
        }
        for i in 0..5000 {
            assert_eq!(sub.recv().await.unwrap().payload, json!(i));
        }
    }

    #[test]
    fn dropped_subscriptions_are_pruned() {
        let channel = EventChannel::new();
        let first = channel.subscribe(&EventKind::ALL);
        let _second = channel.subscribe(&EventKind::ALL);
        drop(first);
        assert_eq!(channel.emit_kind(EventKind::State, json!({})), 1);
        assert_eq!(channel.subscriber_count(), 1);
    }

    #[test]
    fn emit_without_subscribers_is_not_an_error() {
        let channel = EventChannel::new();
        assert_eq!(channel.emit_kind(EventKind::State, json!({})), 0);
        let _sub = channel.subscribe(&EventKind::ALL);
        assert_eq!(channel.subscriber_count(), 1);
        assert_eq!(channel.emit_kind(EventKind::State, json!({})), 1);
    }
}

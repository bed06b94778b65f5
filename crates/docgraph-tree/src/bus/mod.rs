//! Notification bus between a document graph and its observers
//!
//! Every subscriber gets its own unbounded channel, so a slow or idle
//! observer never causes another one to miss events, and no event is ever
//! dropped for lack of capacity. Delivery is synchronous and ordered:
//! [`EventBus::publish`] returns once the event is queued for every live
//! subscriber, and [`EventReceiver::try_next`] yields events in publication
//! order.
//!
//! # Example
//!
//! ```rust
//! use docgraph_tree::bus::{EventBus, GraphEvent, ReplaceEvent};
//! use docgraph_tree::{GraphId, NodeId};
//!
//! let bus = EventBus::new();
//! let mut subscriber = bus.subscribe();
//!
//! bus.publish(GraphEvent::StructureChanged(ReplaceEvent {
//!     graph: GraphId::new(),
//!     root: NodeId(0),
//! }));
//!
//! let event = subscriber.try_next().unwrap();
//! assert_eq!(event.kind(), "structure_changed");
//! ```

pub mod events;

pub use events::{GraphEvent, PropertyEvent, ReplaceEvent, StructureEvent};

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Fan-out publisher for [`GraphEvent`]s
///
/// Clones share the same subscriber list.
#[derive(Clone, Debug, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<GraphEvent>>>>,
}

impl EventBus {
    /// Create a bus without subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to all live subscribers
    ///
    /// Subscribers whose receiver has been dropped are pruned.
    pub fn publish(&self, event: GraphEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
    }

    /// Subscribe to all future events
    ///
    /// Events published before the call are not replayed.
    pub fn subscribe(&self) -> EventReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().push(sender);
        EventReceiver { receiver }
    }

    /// Number of subscribers that have not been pruned yet
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sender| !sender.is_closed());
        subscribers.len()
    }
}

/// Receiving end of one subscription
#[derive(Debug)]
pub struct EventReceiver {
    receiver: mpsc::UnboundedReceiver<GraphEvent>,
}

impl EventReceiver {
    /// Next queued event, if any, without blocking
    pub fn try_next(&mut self) -> Option<GraphEvent> {
        self.receiver.try_recv().ok()
    }

    /// Take every queued event, in publication order
    pub fn drain(&mut self) -> Vec<GraphEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_next() {
            events.push(event);
        }
        events
    }

    /// Wait for the next event; `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<GraphEvent> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{GraphId, NodeId};

    fn replace(root: u64) -> GraphEvent {
        GraphEvent::StructureChanged(ReplaceEvent {
            graph: GraphId::new(),
            root: NodeId(root),
        })
    }

    #[test]
    fn test_event_bus_publish_subscribe() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();

        bus.publish(replace(1));

        match subscriber.try_next() {
            Some(GraphEvent::StructureChanged(e)) => assert_eq!(e.root, NodeId(1)),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(subscriber.try_next().is_none());
    }

    #[test]
    fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new();
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        bus.publish(replace(1));
        bus.publish(replace(2));

        assert_eq!(sub1.drain().len(), 2);
        assert_eq!(sub2.drain().len(), 2);
    }

    #[test]
    fn test_event_bus_preserves_order() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();
        for root in 0..5 {
            bus.publish(replace(root));
        }

        let roots: Vec<u64> = subscriber
            .drain()
            .into_iter()
            .map(|e| match e {
                GraphEvent::StructureChanged(r) => r.root.0,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(roots, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_event_bus_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new();
        bus.publish(replace(1));
        let mut subscriber = bus.subscribe();
        assert!(subscriber.try_next().is_none());
    }

    #[test]
    fn test_event_bus_prunes_dropped_subscribers() {
        let bus = EventBus::new();
        let sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(sub1);
        bus.publish(replace(1));
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_event_receiver_recv_async() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();
        bus.publish(replace(3));
        let event = subscriber.recv().await.unwrap();
        assert_eq!(event.kind(), "structure_changed");
    }
}

//! In-process topic broker.
//!
//! [`LoopbackBroker`] stands in for a real message broker: any number of
//! [`LoopbackTransport`] clients connect to it, subscribe to topics and publish
//! to destinations. A destination is delivered to the topic it is routed to
//! (or to the topic of the same name when no route exists), and every
//! subscriber of that topic receives the frame, the sender included.
//!
//! Events reach each client through its own `crossbeam-channel` queue and are
//! only observed when the client's owner polls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::transport::{SubscriptionId, Transport, TransportError, TransportEvent};

/// A frame published by some client, as recorded by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFrame {
    /// Destination the client published to.
    pub destination: String,
    /// JSON body.
    pub body: String,
}

struct ClientSlot {
    events: Sender<TransportEvent>,
    connected: bool,
}

struct TopicSubscription {
    client: u64,
    id: SubscriptionId,
    topic: String,
}

#[derive(Default)]
struct BrokerState {
    clients: HashMap<u64, ClientSlot>,
    subscriptions: Vec<TopicSubscription>,
    routes: HashMap<String, String>,
    refusal: Option<String>,
    published: Vec<PublishedFrame>,
    next_client: u64,
    next_subscription: u64,
    connections_opened: usize,
}

impl BrokerState {
    fn deliver(&self, topic: &str, body: &str) -> usize {
        let mut delivered = 0;
        for sub in self.subscriptions.iter().filter(|s| s.topic == topic) {
            let Some(slot) = self.clients.get(&sub.client) else {
                continue;
            };
            let event = TransportEvent::Frame {
                subscription: sub.id,
                body: body.to_string(),
            };
            if slot.events.send(event).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    fn drop_subscriptions_of(&mut self, client: u64) {
        self.subscriptions.retain(|s| s.client != client);
    }
}

/// Shared handle to an in-process broker. Cloning shares the same broker.
#[derive(Clone, Default)]
pub struct LoopbackBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl LoopbackBroker {
    /// Create an empty broker that accepts every connection.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a new, not yet connected, client of this broker.
    pub fn client(&self) -> LoopbackTransport {
        let (tx, rx) = unbounded();
        let mut state = self.lock();
        let id = state.next_client;
        state.next_client += 1;
        state.clients.insert(
            id,
            ClientSlot {
                events: tx,
                connected: false,
            },
        );
        LoopbackTransport {
            id,
            state: Arc::clone(&self.state),
            events: rx,
        }
    }

    /// Deliver frames published to `destination` to subscribers of `topic`.
    pub fn route(&self, destination: &str, topic: &str) {
        self.lock()
            .routes
            .insert(destination.to_string(), topic.to_string());
    }

    /// Refuse further connection attempts with `reason`, or accept them
    /// again with `None`.
    pub fn refuse_connections(&self, reason: Option<&str>) {
        self.lock().refusal = reason.map(str::to_string);
    }

    /// Drop every connected client, as a broker restart would.
    pub fn close_all(&self, reason: &str) {
        let mut state = self.lock();
        let mut dropped = Vec::new();
        for (id, slot) in state.clients.iter_mut().filter(|(_, s)| s.connected) {
            slot.connected = false;
            let _ = slot.events.send(TransportEvent::Closed {
                reason: reason.to_string(),
            });
            dropped.push(*id);
        }
        for id in dropped {
            state.drop_subscriptions_of(id);
        }
        tracing::debug!("Loopback broker closed all clients: {reason}");
    }

    /// Push `body` to every subscriber of `topic` without a publishing
    /// client. Returns the number of deliveries.
    pub fn inject(&self, topic: &str, body: &str) -> usize {
        self.lock().deliver(topic, body)
    }

    /// Number of connection attempts seen so far.
    pub fn connections_opened(&self) -> usize {
        self.lock().connections_opened
    }

    /// Number of clients currently connected.
    pub fn connected_clients(&self) -> usize {
        self.lock().clients.values().filter(|s| s.connected).count()
    }

    /// Every frame published by a client, in publish order.
    pub fn published(&self) -> Vec<PublishedFrame> {
        self.lock().published.clone()
    }

    /// Topics of all live subscriptions, in the order they were made.
    pub fn subscribed_topics(&self) -> Vec<String> {
        self.lock()
            .subscriptions
            .iter()
            .map(|s| s.topic.clone())
            .collect()
    }
}

/// One client connection to a [`LoopbackBroker`].
pub struct LoopbackTransport {
    id: u64,
    state: Arc<Mutex<BrokerState>>,
    events: Receiver<TransportEvent>,
}

impl LoopbackTransport {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_connected(state: &BrokerState, id: u64) -> bool {
        state.clients.get(&id).is_some_and(|s| s.connected)
    }
}

impl Transport for LoopbackTransport {
    fn open(&mut self, endpoint: &str) -> Result<(), TransportError> {
        if endpoint.trim().is_empty() {
            return Err(TransportError::InvalidEndpoint(endpoint.to_string()));
        }
        let mut state = self.lock();
        state.connections_opened += 1;
        let refusal = state.refusal.clone();
        let Some(slot) = state.clients.get_mut(&self.id) else {
            return Err(TransportError::Closed("client detached".to_string()));
        };
        let event = match refusal {
            Some(reason) => TransportEvent::ConnectFailed(TransportError::Refused {
                endpoint: endpoint.to_string(),
                reason,
            }),
            None => {
                slot.connected = true;
                TransportEvent::Connected
            }
        };
        let _ = slot.events.send(event);
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<SubscriptionId, TransportError> {
        let mut state = self.lock();
        if !Self::is_connected(&state, self.id) {
            return Err(TransportError::NotConnected);
        }
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.subscriptions.push(TopicSubscription {
            client: self.id,
            id,
            topic: topic.to_string(),
        });
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        let client = self.id;
        self.lock()
            .subscriptions
            .retain(|s| !(s.client == client && s.id == id));
    }

    fn publish(&mut self, destination: &str, body: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        if !Self::is_connected(&state, self.id) {
            return Err(TransportError::NotConnected);
        }
        state.published.push(PublishedFrame {
            destination: destination.to_string(),
            body: body.to_string(),
        });
        let topic = state
            .routes
            .get(destination)
            .cloned()
            .unwrap_or_else(|| destination.to_string());
        let delivered = state.deliver(&topic, body);
        tracing::trace!("Loopback {destination} -> {topic}: {delivered} subscriber(s)");
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.lock();
        if let Some(slot) = state.clients.get_mut(&self.id) {
            slot.connected = false;
        }
        state.drop_subscriptions_of(self.id);
        drop(state);
        while self.events.try_recv().is_ok() {}
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        let mut state = self.lock();
        state.clients.remove(&self.id);
        state.drop_subscriptions_of(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(broker: &LoopbackBroker) -> LoopbackTransport {
        let mut client = broker.client();
        client.open("ws://loopback").unwrap();
        assert_eq!(client.poll_event(), Some(TransportEvent::Connected));
        client
    }

    #[test]
    fn test_publish_reaches_every_subscriber_including_sender() {
        let broker = LoopbackBroker::new();
        let mut a = connect(&broker);
        let mut b = connect(&broker);
        let sub_a = a.subscribe("/topic/room.1").unwrap();
        let sub_b = b.subscribe("/topic/room.1").unwrap();

        a.publish("/topic/room.1", "{}").unwrap();

        assert!(matches!(
            a.poll_event(),
            Some(TransportEvent::Frame { subscription, .. }) if subscription == sub_a
        ));
        assert!(matches!(
            b.poll_event(),
            Some(TransportEvent::Frame { subscription, .. }) if subscription == sub_b
        ));
    }

    #[test]
    fn test_routes_map_destinations_to_topics() {
        let broker = LoopbackBroker::new();
        broker.route("/app/update", "/topic/room.1");
        let mut a = connect(&broker);
        a.subscribe("/topic/room.1").unwrap();
        a.publish("/app/update", "{\"playerId\":\"a\"}").unwrap();

        assert!(matches!(a.poll_event(), Some(TransportEvent::Frame { .. })));
        assert_eq!(broker.published()[0].destination, "/app/update");
    }

    #[test]
    fn test_refused_connection_emits_failure() {
        let broker = LoopbackBroker::new();
        broker.refuse_connections(Some("maintenance"));
        let mut a = broker.client();
        a.open("ws://loopback").unwrap();
        assert!(matches!(
            a.poll_event(),
            Some(TransportEvent::ConnectFailed(TransportError::Refused { .. }))
        ));
        assert_eq!(broker.connected_clients(), 0);
    }

    #[test]
    fn test_operations_require_connection() {
        let broker = LoopbackBroker::new();
        let mut a = broker.client();
        assert_eq!(a.subscribe("/topic/x"), Err(TransportError::NotConnected));
        assert_eq!(a.publish("/topic/x", "{}"), Err(TransportError::NotConnected));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let broker = LoopbackBroker::new();
        let mut a = connect(&broker);
        let sub = a.subscribe("/topic/x").unwrap();
        a.unsubscribe(sub);
        assert_eq!(broker.inject("/topic/x", "{}"), 0);
        assert_eq!(a.poll_event(), None);
    }

    #[test]
    fn test_close_all_notifies_connected_clients() {
        let broker = LoopbackBroker::new();
        let mut a = connect(&broker);
        a.subscribe("/topic/x").unwrap();
        broker.close_all("restart");
        assert_eq!(
            a.poll_event(),
            Some(TransportEvent::Closed {
                reason: "restart".to_string()
            })
        );
        assert!(broker.subscribed_topics().is_empty());
    }

    #[test]
    fn test_dropping_client_releases_subscriptions() {
        let broker = LoopbackBroker::new();
        {
            let mut a = connect(&broker);
            a.subscribe("/topic/x").unwrap();
        }
        assert!(broker.subscribed_topics().is_empty());
        assert_eq!(broker.connected_clients(), 0);
    }
}

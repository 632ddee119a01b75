//! Connection lifecycle and topic subscriptions over a [`Transport`].
//!
//! [`Session`] walks the state machine Disconnected → Connecting → Connected →
//! Disconnected. Subscriptions requested before the connection is up are
//! queued and replayed, in request order, the moment the broker accepts the
//! connection. Sends are never queued: a frame sent while not connected is
//! dropped with a warning. When the connection goes away, whether the broker
//! dropped it or the caller disconnected, the live subscriptions are queued
//! again for the next connect.
//!
//! Nothing happens behind the caller's back. Transport events are only
//! processed inside [`Session::poll`], so every callback runs on the thread
//! that drives the simulation, between ticks.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::messages::{GameMessage, decode_message};
use crate::transport::{SubscriptionId, Transport, TransportError, TransportEvent};

/// Callback receiving decoded messages of one subscription.
pub type MessageCallback = Box<dyn FnMut(GameMessage)>;
/// Callback run once the connection is established.
pub type ConnectedCallback = Box<dyn FnOnce()>;
/// Callback run when the connection attempt fails.
pub type ErrorCallback = Box<dyn FnOnce(TransportError)>;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No channel.
    Disconnected,
    /// Channel opened, waiting for the broker's answer.
    Connecting,
    /// Broker accepted the connection.
    Connected,
}

/// Handle returned by [`Session::subscribe`].
///
/// [`unsubscribe`](Self::unsubscribe) may be called any number of times, at
/// any point, including after the session disconnected. The subscription is
/// released on the next [`Session::poll`]; a still-queued request is simply
/// never sent.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    cancelled: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel the subscription.
    pub fn unsubscribe(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// `false` once [`unsubscribe`](Self::unsubscribe) was called.
    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::Relaxed)
    }
}

/// Counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames delivered to a live subscription.
    pub frames_received: u64,
    /// Frames that failed to decode.
    pub decode_failures: u64,
    /// Frames handed to the transport.
    pub sent: u64,
    /// Frames dropped because the session was not connected.
    pub dropped_sends: u64,
}

struct Subscription {
    topic: String,
    callback: MessageCallback,
    cancelled: Arc<AtomicBool>,
}

impl Subscription {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// A single reusable broker connection.
pub struct Session<T: Transport> {
    transport: T,
    state: ConnectionState,
    pending: VecDeque<Subscription>,
    active: HashMap<SubscriptionId, Subscription>,
    waiting: Vec<(ConnectedCallback, ErrorCallback)>,
    stats: SessionStats,
}

impl<T: Transport> Session<T> {
    /// Wrap a transport. The session starts disconnected.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            pending: VecDeque::new(),
            active: HashMap::new(),
            waiting: Vec::new(),
            stats: SessionStats::default(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Shorthand for `state() == Connected`.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Connect to `endpoint`.
    ///
    /// - Connected: `on_connected` runs immediately, no new channel.
    /// - Connecting: the callbacks join the attempt already in flight.
    /// - Disconnected: a channel is opened. On success the queued
    ///   subscriptions are registered first, then `on_connected` runs; on
    ///   failure `on_error` receives the reason.
    pub fn connect(
        &mut self,
        endpoint: &str,
        on_connected: impl FnOnce() + 'static,
        on_error: impl FnOnce(TransportError) + 'static,
    ) {
        match self.state {
            ConnectionState::Connected => on_connected(),
            ConnectionState::Connecting => {
                self.waiting
                    .push((Box::new(on_connected), Box::new(on_error)));
            }
            ConnectionState::Disconnected => {
                self.waiting
                    .push((Box::new(on_connected), Box::new(on_error)));
                self.state = ConnectionState::Connecting;
                tracing::info!("Connecting to {endpoint}");
                if let Err(err) = self.transport.open(endpoint) {
                    self.fail_connect(err);
                }
            }
        }
    }

    /// Subscribe `callback` to `topic`.
    ///
    /// While not connected the request is queued and the handle is returned
    /// at once; callers must not assume the subscription is live yet.
    pub fn subscribe(
        &mut self,
        topic: &str,
        callback: impl FnMut(GameMessage) + 'static,
    ) -> SubscriptionHandle {
        let handle = SubscriptionHandle::new();
        let sub = Subscription {
            topic: topic.to_string(),
            callback: Box::new(callback),
            cancelled: Arc::clone(&handle.cancelled),
        };
        if self.is_connected() {
            self.register(sub);
        } else {
            tracing::debug!("Queueing subscription to {topic} until connected");
            self.pending.push_back(sub);
        }
        handle
    }

    /// Serialize `body` as JSON and publish it to `destination`.
    ///
    /// Returns `true` if the frame was handed to the transport. While not
    /// connected the frame is dropped, never buffered.
    pub fn send_message<B: Serialize + ?Sized>(&mut self, destination: &str, body: &B) -> bool {
        if !self.is_connected() {
            tracing::warn!("Dropping frame to {destination}: not connected");
            self.stats.dropped_sends += 1;
            return false;
        }
        let text = match serde_json::to_string(body) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("Dropping frame to {destination}: {err}");
                self.stats.dropped_sends += 1;
                return false;
            }
        };
        match self.transport.publish(destination, &text) {
            Ok(()) => {
                self.stats.sent += 1;
                true
            }
            Err(err) => {
                tracing::warn!("Publish to {destination} failed: {err}");
                self.stats.dropped_sends += 1;
                false
            }
        }
    }

    /// Tear the channel down. Idempotent. Live subscriptions go back to the
    /// queue, and the queue is replayed by the next successful
    /// [`connect`](Self::connect).
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        tracing::info!("Disconnecting");
        self.transport.close();
        self.requeue_active();
        self.state = ConnectionState::Disconnected;
        for (_, on_error) in self.waiting.drain(..) {
            on_error(TransportError::Closed("disconnected by client".to_string()));
        }
    }

    /// Cancel every active and queued subscription. Used on teardown.
    pub fn unsubscribe_all(&mut self) {
        for sub in self.active.values().chain(self.pending.iter()) {
            sub.cancelled.store(true, Ordering::Relaxed);
        }
        self.sweep_cancelled();
    }

    /// Process every queued transport event and dispatch decoded frames.
    /// Returns the number of events handled.
    pub fn poll(&mut self) -> usize {
        self.sweep_cancelled();

        let mut handled = 0;
        while let Some(event) = self.transport.poll_event() {
            handled += 1;
            match event {
                TransportEvent::Connected => self.on_transport_connected(),
                TransportEvent::ConnectFailed(err) => {
                    if self.state == ConnectionState::Connecting {
                        self.fail_connect(err);
                    }
                }
                TransportEvent::Frame { subscription, body } => {
                    self.dispatch(subscription, &body);
                }
                TransportEvent::Closed { reason } => {
                    if self.state != ConnectionState::Disconnected {
                        tracing::warn!("Connection lost: {reason}");
                        self.requeue_active();
                        self.state = ConnectionState::Disconnected;
                    }
                }
            }
        }
        handled
    }

    /// Number of subscriptions waiting for a connection.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of live subscriptions.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Diagnostic counters.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn register(&mut self, sub: Subscription) {
        match self.transport.subscribe(&sub.topic) {
            Ok(id) => {
                tracing::debug!("Subscribed to {} as {:?}", sub.topic, id);
                self.active.insert(id, sub);
            }
            Err(err) => {
                tracing::warn!("Subscribe to {} failed ({err}), requeueing", sub.topic);
                self.pending.push_back(sub);
            }
        }
    }

    fn on_transport_connected(&mut self) {
        if self.state != ConnectionState::Connecting {
            tracing::debug!("Ignoring connect event in state {:?}", self.state);
            return;
        }
        self.state = ConnectionState::Connected;
        tracing::info!(
            "Connected, replaying {} queued subscription(s)",
            self.pending.len()
        );

        let queued: Vec<Subscription> = self.pending.drain(..).collect();
        for sub in queued {
            if !sub.is_cancelled() {
                self.register(sub);
            }
        }
        for (on_connected, _) in self.waiting.drain(..) {
            on_connected();
        }
    }

    fn fail_connect(&mut self, err: TransportError) {
        tracing::warn!("Connection failed: {err}");
        self.state = ConnectionState::Disconnected;
        for (_, on_error) in self.waiting.drain(..) {
            on_error(err.clone());
        }
    }

    fn dispatch(&mut self, subscription: SubscriptionId, body: &str) {
        let Some(sub) = self.active.get_mut(&subscription) else {
            return;
        };
        if sub.is_cancelled() {
            return;
        }
        match decode_message(body) {
            Ok(msg) => {
                self.stats.frames_received += 1;
                (sub.callback)(msg);
            }
            Err(err) => {
                self.stats.decode_failures += 1;
                tracing::warn!("Discarding undecodable frame on {}: {err}", sub.topic);
            }
        }
    }

    /// Move live subscriptions back to the front of the queue, oldest first,
    /// so the next successful connect restores them.
    fn requeue_active(&mut self) {
        let mut lost: Vec<(SubscriptionId, Subscription)> = self.active.drain().collect();
        lost.sort_by_key(|(id, _)| id.0);
        for (_, sub) in lost.into_iter().rev() {
            if !sub.is_cancelled() {
                self.pending.push_front(sub);
            }
        }
    }

    fn sweep_cancelled(&mut self) {
        self.pending.retain(|sub| !sub.is_cancelled());

        let cancelled: Vec<SubscriptionId> = self
            .active
            .iter()
            .filter(|(_, sub)| sub.is_cancelled())
            .map(|(id, _)| *id)
            .collect();
        for id in cancelled {
            if let Some(sub) = self.active.remove(&id) {
                tracing::debug!("Unsubscribed from {}", sub.topic);
            }
            self.transport.unsubscribe(id);
        }
    }
}

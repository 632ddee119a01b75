//! Boundary to the message-broker client library.
//!
//! A [`Transport`] owns one channel to a broker. Calls never block: opening a
//! channel only starts the attempt, and its outcome (like every inbound frame)
//! is queued as a [`TransportEvent`] that the owning
//! [`Session`](crate::session::Session) drains once per tick.

/// Transport-assigned identifier of an active topic subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Something that happened on the channel since the last poll.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The broker accepted the connection.
    Connected,
    /// The connection attempt failed.
    ConnectFailed(TransportError),
    /// A text frame arrived on a subscription.
    Frame {
        /// Subscription the frame was delivered to.
        subscription: SubscriptionId,
        /// Raw frame body (JSON text).
        body: String,
    },
    /// An established connection was lost.
    Closed {
        /// Diagnostic reason reported by the transport.
        reason: String,
    },
}

/// Errors reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The broker refused or could not be reached.
    #[error("connection to {endpoint} refused: {reason}")]
    Refused {
        /// Endpoint that was dialled.
        endpoint: String,
        /// Reason given by the broker or OS.
        reason: String,
    },
    /// The endpoint string is unusable.
    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),
    /// The operation needs an established connection.
    #[error("not connected")]
    NotConnected,
    /// The connection was closed while the operation was outstanding.
    #[error("connection closed: {0}")]
    Closed(String),
}

/// Pub/sub channel to a message broker.
pub trait Transport {
    /// Start connecting to `endpoint`. The outcome arrives later as
    /// [`TransportEvent::Connected`] or [`TransportEvent::ConnectFailed`];
    /// an `Err` here means the attempt could not even be started.
    fn open(&mut self, endpoint: &str) -> Result<(), TransportError>;

    /// Subscribe to `topic` on the established connection.
    fn subscribe(&mut self, topic: &str) -> Result<SubscriptionId, TransportError>;

    /// Drop a subscription. Unknown ids are ignored.
    fn unsubscribe(&mut self, id: SubscriptionId);

    /// Publish a text frame to `destination`.
    fn publish(&mut self, destination: &str, body: &str) -> Result<(), TransportError>;

    /// Tear the channel down. Safe to call when already closed.
    fn close(&mut self);

    /// Pop the next queued event, if any.
    fn poll_event(&mut self) -> Option<TransportEvent>;
}

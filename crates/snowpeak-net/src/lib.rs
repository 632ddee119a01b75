//! Networking for the avatar client: wire messages, the transport boundary,
//! the connection session and an in-process loopback broker.

pub mod loopback;
pub mod messages;
pub mod session;
pub mod transport;

pub use loopback::{LoopbackBroker, LoopbackTransport, PublishedFrame};
pub use messages::{
    ChatLine, FixedPosition, GameMessage, MessageError, PlayerRole, PlayerState, decode_message,
    encode_message,
};
pub use session::{ConnectionState, Session, SessionStats, SubscriptionHandle};
pub use transport::{SubscriptionId, Transport, TransportError, TransportEvent};

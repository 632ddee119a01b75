//! Room-level multiplayer state: who is present, what the local player tells
//! the others, and the chat history.

pub mod chat;
pub mod publisher;
pub mod registry;

pub use chat::{CHAT_HISTORY_LEN, ChatLog, ChatRejection, prepare_outgoing};
pub use publisher::StatePublisher;
pub use registry::{PlayerRegistry, ReconcileReport, UpdateOutcome};

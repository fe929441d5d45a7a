//! # chatter-shared
//!
//! Types shared by the Chatter store and server crates: identity newtypes,
//! the JSON wire protocol spoken over the WebSocket, and protocol errors.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::ProtocolError;
pub use protocol::{ChatMessage, InboundMessage};
pub use types::{MessageId, ServerId, TabId, UserId};

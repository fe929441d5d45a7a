use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::types::{MessageId, ServerId, TabId, UserId};

/// Reference to the tab an inbound message targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TabRef {
    pub id: TabId,
}

/// A chat message as sent by a client, one JSON object per frame.
///
/// The sender is never part of the payload; it is the identity of the
/// connection the frame arrived on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
    pub tab: TabRef,
}

impl InboundMessage {
    pub fn new(text: impl Into<String>, tab: TabId) -> Self {
        Self {
            text: text.into(),
            tab: TabRef { id: tab },
        }
    }

    /// Decode a frame payload.
    pub fn from_json(data: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SenderInfo {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub server_id: ServerId,
    pub name: String,
}

/// A persisted chat message, in the shape pushed to clients.
///
/// Every field comes from the store: `id` is the generated sequence id and
/// `date_sent` is assigned when the message is written, not by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub text: String,
    pub sender: SenderInfo,
    pub tab: TabInfo,
    pub date_sent: DateTime<Utc>,
}

impl ChatMessage {
    /// Encode for transmission as a text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn from_json(data: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

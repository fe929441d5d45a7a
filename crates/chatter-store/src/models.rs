//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the REST layer.  Messages are read back as
//! [`chatter_shared::ChatMessage`], the same shape pushed to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chatter_shared::{ServerId, TabId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Stored as given; never serialized back out.
    #[serde(skip_serializing, default)]
    pub password: String,
    pub date_created: DateTime<Utc>,
    /// Rows created by the demo seeder.
    #[serde(default)]
    pub is_test: bool,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            password: password.into(),
            date_created: Utc::now(),
            is_test: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A server groups member users and tabs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub id: ServerId,
    pub name: String,
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub is_test: bool,
}

impl Server {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ServerId::new(),
            name: name.into(),
            date_created: Utc::now(),
            is_test: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tab
// ---------------------------------------------------------------------------

/// A conversation tab.  Belongs to exactly one server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tab {
    pub id: TabId,
    pub name: String,
    pub server_id: ServerId,
    pub date_created: DateTime<Utc>,
}

impl Tab {
    pub fn new(name: impl Into<String>, server_id: ServerId) -> Self {
        Self {
            id: TabId::new(),
            name: name.into(),
            server_id,
            date_created: Utc::now(),
        }
    }
}

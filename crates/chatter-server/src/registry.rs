//! Table of live connections, keyed by client identity.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use chatter_shared::UserId;

use crate::connection::{ClientConnection, ConnectionId};
use crate::error::ChatError;

/// Shared identity -> connection table.
///
/// One read-write lock guards the whole table: fan-out snapshots and lookups
/// share it, connects and disconnects take it exclusively.  The lock is never
/// held across an `.await`.
#[derive(Default)]
pub struct ConnectionRegistry {
    clients: RwLock<HashMap<UserId, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` for `user_id`, replacing any previous entry.
    ///
    /// The replaced connection is returned but not closed; its own ingestion
    /// loop ends it when its socket fails.
    pub fn add(
        &self,
        user_id: UserId,
        connection: Arc<ClientConnection>,
    ) -> Option<Arc<ClientConnection>> {
        let conn_id = connection.id();
        let previous = self.clients.write().insert(user_id, connection);
        debug!(
            user_id = %user_id,
            conn_id,
            replaced = previous.as_ref().map(|c| c.id()),
            "Connection registered"
        );
        previous
    }

    /// Deregister `user_id`.  Fails with `ConnectionNotFound` when nothing is
    /// registered, leaving the table untouched.
    pub fn remove(&self, user_id: UserId) -> Result<Arc<ClientConnection>, ChatError> {
        let removed = self
            .clients
            .write()
            .remove(&user_id)
            .ok_or(ChatError::ConnectionNotFound(user_id))?;
        debug!(user_id = %user_id, conn_id = removed.id(), "Connection unregistered");
        Ok(removed)
    }

    /// Deregister `user_id` only while it still maps to `conn_id`.
    ///
    /// Returns `Ok(false)` when a newer connection has replaced it, in which
    /// case the newer entry stays.
    pub fn remove_if_current(
        &self,
        user_id: UserId,
        conn_id: ConnectionId,
    ) -> Result<bool, ChatError> {
        let mut clients = self.clients.write();
        let current = clients
            .get(&user_id)
            .ok_or(ChatError::ConnectionNotFound(user_id))?;
        if current.id() != conn_id {
            debug!(
                user_id = %user_id,
                conn_id,
                current = current.id(),
                "Connection already superseded"
            );
            return Ok(false);
        }
        clients.remove(&user_id);
        debug!(user_id = %user_id, conn_id, "Connection unregistered");
        Ok(true)
    }

    pub fn lookup(&self, user_id: UserId) -> Result<Arc<ClientConnection>, ChatError> {
        self.clients
            .read()
            .get(&user_id)
            .cloned()
            .ok_or(ChatError::ConnectionNotFound(user_id))
    }

    /// Point-in-time copy of the table, for iterating without the lock.
    pub fn snapshot(&self) -> HashMap<UserId, Arc<ClientConnection>> {
        self.clients.read().clone()
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.clients.read().contains_key(&user_id)
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

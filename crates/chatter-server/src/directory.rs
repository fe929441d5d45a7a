//! Collaborators consumed by the dispatcher, and their SQLite implementation.
//!
//! The dispatcher only sees these traits.  [`SqliteStore`] implements all
//! three over the shared [`Database`] by running each query on a blocking
//! thread.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use chatter_shared::{ChatMessage, MessageId, ServerId, TabId, UserId};
use chatter_store::{Database, Tab};

use crate::error::ChatError;

/// rusqlite is synchronous; the connection lives behind a mutex and is only
/// touched from `spawn_blocking`.
pub type SharedDatabase = Arc<Mutex<Database>>;

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message and return its generated sequence id.
    async fn create(
        &self,
        sender: UserId,
        tab: TabId,
        body: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<MessageId, ChatError>;

    async fn get_by_id(&self, id: MessageId) -> Result<ChatMessage, ChatError>;
}

#[async_trait]
pub trait TabDirectory: Send + Sync {
    async fn get_by_id(&self, tab: TabId) -> Result<Tab, ChatError>;
}

#[async_trait]
pub trait ServerDirectory: Send + Sync {
    async fn get_members(&self, server: ServerId) -> Result<HashSet<UserId>, ChatError>;
}

/// Run `f` against the database on the blocking pool.
pub async fn with_db<T, F>(db: &SharedDatabase, f: F) -> Result<T, ChatError>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> chatter_store::Result<T> + Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || {
        let guard = db
            .lock()
            .map_err(|_| ChatError::Internal("database lock poisoned".into()))?;
        f(&guard).map_err(ChatError::from)
    })
    .await?
}

#[derive(Clone)]
pub struct SqliteStore {
    db: SharedDatabase,
}

impl SqliteStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn create(
        &self,
        sender: UserId,
        tab: TabId,
        body: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<MessageId, ChatError> {
        let body = body.to_owned();
        with_db(&self.db, move |db| db.insert_message(sender, tab, &body, sent_at)).await
    }

    async fn get_by_id(&self, id: MessageId) -> Result<ChatMessage, ChatError> {
        with_db(&self.db, move |db| db.get_message(id)).await
    }
}

#[async_trait]
impl TabDirectory for SqliteStore {
    async fn get_by_id(&self, tab: TabId) -> Result<Tab, ChatError> {
        with_db(&self.db, move |db| db.get_tab(tab)).await
    }
}

#[async_trait]
impl ServerDirectory for SqliteStore {
    async fn get_members(&self, server: ServerId) -> Result<HashSet<UserId>, ChatError> {
        let members = with_db(&self.db, move |db| db.get_server_member_ids(server)).await?;
        Ok(members.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatter_store::{Server, User};

    fn seeded() -> (SqliteStore, UserId, Tab) {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&User::new("nikos", "123")).unwrap();
        let server = Server::new("Gamiades");
        db.create_server(&server).unwrap();
        db.add_user_to_server(user, server.id).unwrap();
        let tab = Tab::new("General", server.id);
        db.create_tab(&tab).unwrap();
        (SqliteStore::new(Arc::new(Mutex::new(db))), user, tab)
    }

    #[tokio::test]
    async fn create_and_reread_message() {
        let (store, user, tab) = seeded();

        let id = store.create(user, tab.id, "hi", Utc::now()).await.unwrap();
        let msg = MessageStore::get_by_id(&store, id).await.unwrap();
        assert_eq!(msg.sender.username, "nikos");
        assert_eq!(msg.tab.server_id, tab.server_id);
    }

    #[tokio::test]
    async fn resolves_tab_and_members() {
        let (store, user, tab) = seeded();

        let found = TabDirectory::get_by_id(&store, tab.id).await.unwrap();
        let members = store.get_members(found.server_id).await.unwrap();
        assert_eq!(members, HashSet::from([user]));
    }

    #[tokio::test]
    async fn misses_are_not_found() {
        let (store, _, _) = seeded();

        assert!(TabDirectory::get_by_id(&store, TabId::new())
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store
            .get_members(ServerId::new())
            .await
            .unwrap_err()
            .is_not_found());
        assert!(MessageStore::get_by_id(&store, MessageId(404))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn storage_failure_is_not_not_found() {
        let (store, user, _) = seeded();
        let err = store
            .create(user, TabId::new(), "orphan", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Storage(_)));
    }
}

use chrono::{DateTime, Utc};
use rusqlite::params;

use chatter_shared::protocol::{SenderInfo, TabInfo};
use chatter_shared::{ChatMessage, MessageId, ServerId, TabId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::row::{timestamp_at, uuid_at};

/// Messages joined with their sender and tab, in wire order.
const MESSAGE_SELECT: &str = "
    SELECT m.id, m.text, u.id, u.username, t.id, t.server_id, t.name, m.date_sent
    FROM messages m
    JOIN users u ON u.id = m.sender_id
    JOIN tabs t ON t.id = m.tab_id";

impl Database {
    /// Insert a message and return its generated sequence id.
    ///
    /// `date_sent` is taken from the caller; the dispatcher passes the time of
    /// persistence.  Unknown sender or tab ids violate a foreign key and fail.
    pub fn insert_message(
        &self,
        sender: UserId,
        tab: TabId,
        text: &str,
        date_sent: DateTime<Utc>,
    ) -> Result<MessageId> {
        self.conn().execute(
            "INSERT INTO messages (text, sender_id, tab_id, date_sent)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                text,
                sender.to_string(),
                tab.to_string(),
                date_sent.to_rfc3339(),
            ],
        )?;
        Ok(MessageId(self.conn().last_insert_rowid()))
    }

    pub fn get_message(&self, id: MessageId) -> Result<ChatMessage> {
        self.conn()
            .query_row(
                &format!("{MESSAGE_SELECT} WHERE m.id = ?1"),
                params![id.0],
                row_to_message,
            )
            .map_err(|e| StoreError::or_not_found(e, "message"))
    }

    pub fn list_messages(&self) -> Result<Vec<ChatMessage>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{MESSAGE_SELECT} ORDER BY m.id ASC"))?;
        let rows = stmt.query_map([], row_to_message)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Messages of one tab, oldest first.  Fails with NotFound for an
    /// unknown tab rather than returning an empty list.
    pub fn list_messages_for_tab(&self, tab: TabId) -> Result<Vec<ChatMessage>> {
        self.get_tab(tab)?;

        let mut stmt = self
            .conn()
            .prepare(&format!("{MESSAGE_SELECT} WHERE m.tab_id = ?1 ORDER BY m.id ASC"))?;
        let rows = stmt.query_map(params![tab.to_string()], row_to_message)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: MessageId(row.get(0)?),
        text: row.get(1)?,
        sender: SenderInfo {
            id: UserId(uuid_at(row, 2)?),
            username: row.get(3)?,
        },
        tab: TabInfo {
            id: TabId(uuid_at(row, 4)?),
            server_id: ServerId(uuid_at(row, 5)?),
            name: row.get(6)?,
        },
        date_sent: timestamp_at(row, 7)?,
    })
}

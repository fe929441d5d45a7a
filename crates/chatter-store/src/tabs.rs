//! CRUD operations for [`Tab`] records.

use rusqlite::params;

use chatter_shared::{ServerId, TabId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Tab;
use crate::row::{timestamp_at, uuid_at};

impl Database {
    /// Insert a new tab.  The owning server must exist.
    pub fn create_tab(&self, tab: &Tab) -> Result<TabId> {
        self.get_server(tab.server_id)?;

        self.conn().execute(
            "INSERT INTO tabs (id, name, server_id, date_created)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                tab.id.to_string(),
                tab.name,
                tab.server_id.to_string(),
                tab.date_created.to_rfc3339(),
            ],
        )?;
        Ok(tab.id)
    }

    /// Fetch a single tab by UUID.
    pub fn get_tab(&self, id: TabId) -> Result<Tab> {
        self.conn()
            .query_row(
                "SELECT id, name, server_id, date_created
                 FROM tabs
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_tab,
            )
            .map_err(|e| StoreError::or_not_found(e, "tab"))
    }

    /// List all tabs, ordered by creation date.
    pub fn list_tabs(&self) -> Result<Vec<Tab>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, server_id, date_created
             FROM tabs
             ORDER BY date_created ASC",
        )?;

        let rows = stmt.query_map([], row_to_tab)?;

        let mut tabs = Vec::new();
        for row in rows {
            tabs.push(row?);
        }
        Ok(tabs)
    }
}

/// Map a `rusqlite::Row` to a [`Tab`].
pub(crate) fn row_to_tab(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tab> {
    Ok(Tab {
        id: TabId(uuid_at(row, 0)?),
        name: row.get(1)?,
        server_id: ServerId(uuid_at(row, 2)?),
        date_created: timestamp_at(row, 3)?,
    })
}

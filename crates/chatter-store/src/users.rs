//! CRUD operations for [`User`] records.

use rusqlite::{params, OptionalExtension};

use chatter_shared::UserId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;
use crate::row::{timestamp_at, uuid_at};

const USER_COLUMNS: &str = "id, username, password, date_created, is_test";

impl Database {
    /// Insert a new user.  Fails with [`StoreError::Conflict`] if the
    /// username is taken.
    pub fn create_user(&self, user: &User) -> Result<UserId> {
        self.conn()
            .execute(
                "INSERT INTO users (id, username, password, date_created, is_test)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id.to_string(),
                    user.username,
                    user.password,
                    user.date_created.to_rfc3339(),
                    user.is_test,
                ],
            )
            .map_err(|e| StoreError::or_conflict(e, "user"))?;
        Ok(user.id)
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(|e| StoreError::or_not_found(e, "user"))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username ASC"
        ))?;
        let rows = stmt.query_map([], row_to_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Look up a seeded demo user by username.
    pub fn find_test_user(&self, username: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1 AND is_test = 1"),
                params![username],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }
}

pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(uuid_at(row, 0)?),
        username: row.get(1)?,
        password: row.get(2)?,
        date_created: timestamp_at(row, 3)?,
        is_test: row.get(4)?,
    })
}

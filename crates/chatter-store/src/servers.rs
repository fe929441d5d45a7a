//! CRUD operations for [`Server`] records and their member lists.

use rusqlite::{params, OptionalExtension};

use chatter_shared::{ServerId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Server, Tab, User};
use crate::row::{timestamp_at, uuid_at};
use crate::tabs::row_to_tab;
use crate::users::row_to_user;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    pub fn create_server(&self, server: &Server) -> Result<ServerId> {
        self.conn().execute(
            "INSERT INTO servers (id, name, date_created, is_test)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                server.id.to_string(),
                server.name,
                server.date_created.to_rfc3339(),
                server.is_test,
            ],
        )?;
        Ok(server.id)
    }

    /// Add `user_id` to the server's members.  Adding an existing member is
    /// a no-op.
    pub fn add_user_to_server(&self, user_id: UserId, server_id: ServerId) -> Result<()> {
        // Surface unknown ids as NotFound rather than a foreign key failure.
        self.get_server(server_id)?;
        self.get_user(user_id)?;

        self.conn().execute(
            "INSERT OR IGNORE INTO server_members (server_id, user_id) VALUES (?1, ?2)",
            params![server_id.to_string(), user_id.to_string()],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_server(&self, id: ServerId) -> Result<Server> {
        self.conn()
            .query_row(
                "SELECT id, name, date_created, is_test FROM servers WHERE id = ?1",
                params![id.to_string()],
                row_to_server,
            )
            .map_err(|e| StoreError::or_not_found(e, "server"))
    }

    pub fn list_servers(&self) -> Result<Vec<Server>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, name, date_created, is_test FROM servers ORDER BY name ASC")?;
        let rows = stmt.query_map([], row_to_server)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Look up a seeded demo server by name.
    pub fn find_test_server(&self, name: &str) -> Result<Option<Server>> {
        self.conn()
            .query_row(
                "SELECT id, name, date_created, is_test FROM servers
                 WHERE name = ?1 AND is_test = 1",
                params![name],
                row_to_server,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// Identities of every member of the server.
    pub fn get_server_member_ids(&self, server_id: ServerId) -> Result<Vec<UserId>> {
        self.get_server(server_id)?;

        let mut stmt = self
            .conn()
            .prepare("SELECT user_id FROM server_members WHERE server_id = ?1")?;
        let rows = stmt.query_map(params![server_id.to_string()], |row| {
            uuid_at(row, 0).map(UserId)
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Full user records of every member of the server.
    pub fn get_server_users(&self, server_id: ServerId) -> Result<Vec<User>> {
        self.get_server(server_id)?;

        let mut stmt = self.conn().prepare(
            "SELECT u.id, u.username, u.password, u.date_created, u.is_test
             FROM users u
             JOIN server_members m ON m.user_id = u.id
             WHERE m.server_id = ?1
             ORDER BY u.username ASC",
        )?;
        let rows = stmt.query_map(params![server_id.to_string()], row_to_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn list_tabs_for_server(&self, server_id: ServerId) -> Result<Vec<Tab>> {
        self.get_server(server_id)?;

        let mut stmt = self.conn().prepare(
            "SELECT id, name, server_id, date_created
             FROM tabs
             WHERE server_id = ?1
             ORDER BY name ASC",
        )?;
        let rows = stmt.query_map(params![server_id.to_string()], row_to_tab)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_server(row: &rusqlite::Row<'_>) -> rusqlite::Result<Server> {
    Ok(Server {
        id: ServerId(uuid_at(row, 0)?),
        name: row.get(1)?,
        date_created: timestamp_at(row, 2)?,
        is_test: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let server = Server::new("Gamiades");
        db.create_server(&server).unwrap();

        let a = db.create_user(&User::new("nikos", "123")).unwrap();
        let b = db.create_user(&User::new("maria", "123")).unwrap();
        db.add_user_to_server(a, server.id).unwrap();
        db.add_user_to_server(b, server.id).unwrap();
        // idempotent
        db.add_user_to_server(a, server.id).unwrap();

        let mut ids = db.get_server_member_ids(server.id).unwrap();
        ids.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);

        let names: Vec<_> = db
            .get_server_users(server.id)
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["maria", "nikos"]);
    }

    #[test]
    fn members_of_unknown_server_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db.get_server_member_ids(ServerId::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("server")));
    }

    #[test]
    fn empty_server_has_no_members() {
        let db = Database::open_in_memory().unwrap();
        let server = Server::new("HUA");
        db.create_server(&server).unwrap();
        assert!(db.get_server_member_ids(server.id).unwrap().is_empty());
    }

    #[test]
    fn add_unknown_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let server = Server::new("CTF");
        db.create_server(&server).unwrap();

        let err = db.add_user_to_server(UserId::new(), server.id).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("user")));
    }

    #[test]
    fn tabs_listed_per_server() {
        let db = Database::open_in_memory().unwrap();
        let one = Server::new("ArchUsers");
        let two = Server::new("CTF");
        db.create_server(&one).unwrap();
        db.create_server(&two).unwrap();
        db.create_tab(&Tab::new("Memes", one.id)).unwrap();
        db.create_tab(&Tab::new("General", one.id)).unwrap();
        db.create_tab(&Tab::new("Studying", two.id)).unwrap();

        let names: Vec<_> = db
            .list_tabs_for_server(one.id)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["General", "Memes"]);
    }
}

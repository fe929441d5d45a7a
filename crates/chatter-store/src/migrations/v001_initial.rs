//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `users`, `servers`, `server_members`,
//! `tabs`, and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    username     TEXT NOT NULL UNIQUE,
    password     TEXT NOT NULL,
    date_created TEXT NOT NULL,               -- RFC-3339
    is_test      INTEGER NOT NULL DEFAULT 0   -- boolean 0/1, demo seed rows
);

-- ----------------------------------------------------------------
-- Servers
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS servers (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    name         TEXT NOT NULL,
    date_created TEXT NOT NULL,
    is_test      INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS server_members (
    server_id TEXT NOT NULL,                  -- FK -> servers(id)
    user_id   TEXT NOT NULL,                  -- FK -> users(id)

    PRIMARY KEY (server_id, user_id),
    FOREIGN KEY (server_id) REFERENCES servers(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id)   REFERENCES users(id)   ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_server_members_user ON server_members(user_id);

-- ----------------------------------------------------------------
-- Tabs
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS tabs (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    name         TEXT NOT NULL,
    server_id    TEXT NOT NULL,               -- FK -> servers(id)
    date_created TEXT NOT NULL,

    FOREIGN KEY (server_id) REFERENCES servers(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_tabs_server_id ON tabs(server_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    text      TEXT NOT NULL,
    sender_id TEXT NOT NULL,                  -- FK -> users(id)
    tab_id    TEXT NOT NULL,                  -- FK -> tabs(id)
    date_sent TEXT NOT NULL,                  -- RFC-3339, assigned by the server

    FOREIGN KEY (sender_id) REFERENCES users(id),
    FOREIGN KEY (tab_id)    REFERENCES tabs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_tab ON messages(tab_id, id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

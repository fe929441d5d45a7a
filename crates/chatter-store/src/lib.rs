//! # chatter-store
//!
//! SQLite persistence for Chatter: users, servers and their members, tabs,
//! and messages.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model.  Async callers are expected to run these on a blocking thread.

pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod servers;
pub mod tabs;
pub mod users;

mod error;
mod row;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;

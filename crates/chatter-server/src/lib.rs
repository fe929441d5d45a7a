//! # chatter-server
//!
//! Real-time side of Chatter plus its REST surface.
//!
//! - [`registry`]: identity -> live connection table
//! - [`ingest`]: one read loop per WebSocket, feeding a bounded queue
//! - [`dispatch`]: the single queue consumer that persists each message and
//!   fans it out to connected members of the owning server
//! - [`gateway`]: `GET /ws/messages?uid=` upgrade handling
//! - [`api`]: CRUD endpoints for users, servers, tabs and messages

pub mod api;
pub mod config;
pub mod connection;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod ingest;
pub mod registry;
pub mod seed;
pub mod service;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ChatError};
pub use service::Service;

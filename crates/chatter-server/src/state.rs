use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::ServerConfig;
use crate::directory::SharedDatabase;
use crate::dispatch::QueuedMessage;
use crate::registry::ConnectionRegistry;

/// Shared state handed to every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub db: SharedDatabase,
    pub registry: Arc<ConnectionRegistry>,
    /// Producer side of the dispatcher queue; cloned into each ingestion loop.
    pub queue: mpsc::Sender<QueuedMessage>,
    pub config: Arc<ServerConfig>,
}

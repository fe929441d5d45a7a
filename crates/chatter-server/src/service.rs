//! Wires the registry, queue and dispatcher together and owns their
//! lifetime.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use chatter_shared::constants::CLOSE_GOING_AWAY;

use crate::api::build_router;
use crate::config::ServerConfig;
use crate::directory::{SharedDatabase, SqliteStore};
use crate::dispatch::{message_queue, Dispatcher};
use crate::registry::ConnectionRegistry;
use crate::state::AppState;

pub struct Service {
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
    dispatcher: JoinHandle<()>,
}

impl Service {
    /// Create the registry and queue and spawn the dispatcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: ServerConfig, db: SharedDatabase) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let (queue, rx) = message_queue(config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let store = Arc::new(SqliteStore::new(db.clone()));
        let dispatcher = Dispatcher::new(
            registry.clone(),
            store.clone(),
            store.clone(),
            store,
            config.write_timeout,
        );
        let dispatcher = tokio::spawn(dispatcher.run(rx, shutdown_rx));

        Self {
            state: AppState {
                db,
                registry,
                queue,
                config: Arc::new(config),
            },
            shutdown_tx,
            dispatcher,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Serve HTTP and WebSocket traffic on `listener` until `signal`
    /// resolves, then shut down.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %listener.local_addr()?, "Starting HTTP server");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await?;

        self.shutdown().await;
        Ok(())
    }

    /// Close the queue, let the dispatcher deliver what is already buffered
    /// (bounded by the configured drain timeout), then close every client.
    pub async fn shutdown(self) {
        let Self {
            state,
            shutdown_tx,
            mut dispatcher,
        } = self;

        let _ = shutdown_tx.send(true);
        let drain = state.config.shutdown_drain;
        match tokio::time::timeout(drain, &mut dispatcher).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Dispatcher task failed"),
            Err(_) => {
                warn!(drain_secs = drain.as_secs(), "Dispatcher did not drain in time");
                dispatcher.abort();
            }
        }

        let clients = state.registry.snapshot();
        for conn in clients.values() {
            conn.close(CLOSE_GOING_AWAY, "server shutting down");
        }
        info!(clients = clients.len(), "Shutdown complete");
    }
}

use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatter_server::{seed, ServerConfig, Service};
use chatter_shared::constants::APP_NAME;
use chatter_store::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Read .env before anything looks at the environment.
    let dotenv = dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chatter_server=debug")),
        )
        .init();

    info!("Starting {} server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv {
        info!(path = %path.display(), "Loaded .env");
    }

    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    let db = Database::open_at(&config.database_path)?;
    if config.seed_demo_data {
        seed::seed_demo_data(&db)?;
    }

    let listener = TcpListener::bind(config.http_addr).await?;
    let service = Service::start(config, Arc::new(Mutex::new(db)));

    service.serve(listener, shutdown_signal()).await?;

    info!("Chatter server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}

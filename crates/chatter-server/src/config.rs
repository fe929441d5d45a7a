//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.  A `.env` file in the working
//! directory is read by `main` before this runs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chatter_shared::constants::{
    DEFAULT_HTTP_PORT, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_OUTBOUND_BUFFER, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_SHUTDOWN_DRAIN_SECS, DEFAULT_WRITE_TIMEOUT_MS,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) server, WebSocket included.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./chatter.db`
    pub database_path: PathBuf,

    /// Capacity of the queue between ingestion loops and the dispatcher.
    /// Ingestion blocks when it is full.
    /// Env: `QUEUE_CAPACITY`
    /// Default: `256`
    pub queue_capacity: usize,

    /// Outbound frames buffered per connection.
    /// Env: `OUTBOUND_BUFFER`
    /// Default: `64`
    pub outbound_buffer: usize,

    /// Largest inbound WebSocket message accepted.  A bigger one fails the
    /// read and ends that connection.
    /// Env: `MAX_MESSAGE_SIZE` (bytes)
    /// Default: `16777216` (16 MiB)
    pub max_message_size: usize,

    /// Upper bound on a single fan-out write.
    /// Env: `WRITE_TIMEOUT_MS`
    /// Default: `5000`
    pub write_timeout: Duration,

    /// How long shutdown waits for the dispatcher to drain the queue.
    /// Env: `SHUTDOWN_DRAIN_SECS`
    /// Default: `10`
    pub shutdown_drain: Duration,

    /// Populate demo users, servers and tabs on startup.
    /// Env: `SEED_DEMO_DATA` (true/false)
    /// Default: `false`
    pub seed_demo_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./chatter.db"),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
            shutdown_drain: Duration::from_secs(DEFAULT_SHUTDOWN_DRAIN_SECS),
            seed_demo_data: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Invalid values are logged and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(n) = parse_nonzero(&lookup, "QUEUE_CAPACITY") {
            config.queue_capacity = n;
        }

        if let Some(n) = parse_nonzero(&lookup, "OUTBOUND_BUFFER") {
            config.outbound_buffer = n;
        }

        if let Some(n) = parse_nonzero(&lookup, "MAX_MESSAGE_SIZE") {
            config.max_message_size = n;
        }

        if let Some(ms) = parse_nonzero(&lookup, "WRITE_TIMEOUT_MS") {
            config.write_timeout = Duration::from_millis(ms as u64);
        }

        if let Some(secs) = lookup("SHUTDOWN_DRAIN_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) => config.shutdown_drain = Duration::from_secs(secs),
                Err(_) => {
                    tracing::warn!(value = %secs, "Invalid SHUTDOWN_DRAIN_SECS, using default")
                }
            }
        }

        if let Some(val) = lookup("SEED_DEMO_DATA") {
            config.seed_demo_data = parse_bool(&val);
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

fn parse_nonzero(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!(key, value = %raw, "Expected a positive integer, using default");
            None
        }
    }
}

fn parse_bool(val: &str) -> bool {
    matches!(val.trim(), "1" | "true" | "TRUE" | "True" | "yes")
}

/// Application name
pub const APP_NAME: &str = "Chatter";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Path of the WebSocket endpoint that carries chat traffic
pub const WS_MESSAGES_PATH: &str = "/ws/messages";

/// Query parameter holding the client identity on upgrade
pub const IDENTITY_QUERY_PARAM: &str = "uid";

/// Default cap on one inbound WebSocket message, in bytes (16 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Capacity of the ingestion -> dispatcher queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Frames buffered per connection before a write has to wait
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Upper bound on a single fan-out write, in milliseconds
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5_000;

/// How long shutdown waits for the dispatcher to drain, in seconds
pub const DEFAULT_SHUTDOWN_DRAIN_SECS: u64 = 10;

/// WebSocket close status: the endpoint received data it cannot accept (RFC 6455 §7.4.1)
pub const CLOSE_UNSUPPORTED_DATA: u16 = 1003;

/// WebSocket close status: the server is going away
pub const CLOSE_GOING_AWAY: u16 = 1001;

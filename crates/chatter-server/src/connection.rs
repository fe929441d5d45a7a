//! Handle to one live client connection.
//!
//! The socket itself is owned by a writer task (see [`crate::gateway`]);
//! a [`ClientConnection`] only holds the sending half of that task's
//! channel, so writes from the dispatcher never touch the socket directly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message};
use tokio::sync::mpsc;

use crate::error::ChatError;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id distinguishing successive connections of one identity.
pub type ConnectionId = u64;

pub struct ClientConnection {
    id: ConnectionId,
    tx: mpsc::Sender<Message>,
    connected_at: Instant,
}

impl ClientConnection {
    pub fn new(tx: mpsc::Sender<Message>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            tx,
            connected_at: Instant::now(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a text frame for the client, waiting at most `timeout` for
    /// room in the outbound buffer.
    pub async fn write_text(&self, frame: String, timeout: Duration) -> Result<(), ChatError> {
        match self.tx.send_timeout(Message::Text(frame), timeout).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => Err(ChatError::Transport(format!(
                "write timed out after {}ms",
                timeout.as_millis()
            ))),
            Err(mpsc::error::SendTimeoutError::Closed(_)) => {
                Err(ChatError::Transport("connection closed".into()))
            }
        }
    }

    /// Ask the writer task to send a close frame and shut the socket.
    ///
    /// Returns `false` if the frame could not be queued.
    pub fn close(&self, code: u16, reason: impl Into<String>) -> bool {
        let frame = CloseFrame {
            code,
            reason: reason.into().into(),
        };
        self.tx.try_send(Message::Close(Some(frame))).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

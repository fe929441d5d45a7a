//! Per-connection read loop: frames in, decoded messages onto the queue.

use std::sync::Arc;

use axum::extract::ws::Message;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use chatter_shared::{InboundMessage, UserId};

use crate::connection::ConnectionId;
use crate::dispatch::QueuedMessage;
use crate::registry::ConnectionRegistry;

/// Why an ingestion loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestEnd {
    /// Close frame received or the stream ended.
    ClientClosed,
    /// Reading from the socket failed.
    ReadError,
    /// The dispatcher queue is closed; the server is shutting down.
    QueueClosed,
    /// The connection was not (or no longer) registered when the loop started.
    NotRegistered,
}

/// Read frames from `frames` until the client goes away, forwarding every
/// decodable message to `queue` tagged with `user_id`.
///
/// Undecodable frames are logged and skipped.  On exit the connection is
/// removed from `registry` unless a newer connection for the same identity
/// has taken its place.
pub async fn run_ingestion<S>(
    user_id: UserId,
    conn_id: ConnectionId,
    mut frames: S,
    registry: Arc<ConnectionRegistry>,
    queue: mpsc::Sender<QueuedMessage>,
) -> IngestEnd
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    match registry.lookup(user_id) {
        Ok(conn) if conn.id() == conn_id => {}
        Ok(_) | Err(_) => {
            warn!(user_id = %user_id, conn_id, "Ingestion started for unregistered connection");
            return IngestEnd::NotRegistered;
        }
    }

    info!(user_id = %user_id, conn_id, "Client connected");

    let end = loop {
        let frame = match frames.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                warn!(user_id = %user_id, conn_id, error = %e, "Read error");
                break IngestEnd::ReadError;
            }
            None => break IngestEnd::ClientClosed,
        };

        let payload = match frame {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(data) => data,
            Message::Close(_) => break IngestEnd::ClientClosed,
            // Pings are answered by the socket itself.
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        let message = match InboundMessage::from_json(&payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    conn_id,
                    error = %e,
                    "Discarding undecodable frame"
                );
                continue;
            }
        };

        debug!(user_id = %user_id, tab_id = %message.tab.id, "Message received");

        if queue
            .send(QueuedMessage {
                sender: user_id,
                message,
            })
            .await
            .is_err()
        {
            break IngestEnd::QueueClosed;
        }
    };

    match registry.remove_if_current(user_id, conn_id) {
        Ok(true) => {}
        Ok(false) => debug!(user_id = %user_id, conn_id, "Left registry entry to newer connection"),
        Err(e) => debug!(user_id = %user_id, conn_id, error = %e, "Connection already gone"),
    }
    info!(user_id = %user_id, conn_id, reason = ?end, "Client disconnected");

    end
}

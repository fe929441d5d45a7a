//! WebSocket entry point: `GET /ws/messages?uid=<uuid>`.
//!
//! A valid identity gets its connection registered and an ingestion loop;
//! anything else is upgraded, sent a 1003 close frame and dropped without
//! ever touching the registry.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use chatter_shared::constants::{CLOSE_GOING_AWAY, CLOSE_UNSUPPORTED_DATA, IDENTITY_QUERY_PARAM};
use chatter_shared::UserId;

use crate::connection::ClientConnection;
use crate::ingest::{run_ingestion, IngestEnd};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub uid: Option<String>,
}

/// Parse the `uid` query value, or build the close frame that rejects it.
pub fn parse_identity(raw: &str) -> Result<UserId, CloseFrame<'static>> {
    raw.parse().map_err(|_| CloseFrame {
        code: CLOSE_UNSUPPORTED_DATA,
        reason: format!("{IDENTITY_QUERY_PARAM} param is not a valid uuid: `{raw}`").into(),
    })
}

pub async fn ws_messages(
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let raw = query.uid.unwrap_or_default();
    let ws = ws.max_message_size(state.config.max_message_size);

    match parse_identity(&raw) {
        Ok(user_id) => ws.on_upgrade(move |socket| on_upgrade(state, socket, user_id)),
        Err(frame) => {
            warn!(uid = %raw, "Rejecting connection with invalid identity");
            ws.on_upgrade(move |mut socket| async move {
                if let Err(e) = socket.send(Message::Close(Some(frame))).await {
                    warn!(
                        uid = %raw,
                        error = %e,
                        "Could not tell client its identity is invalid"
                    );
                }
            })
        }
    }
}

/// Register `socket` under `user_id` and run its ingestion loop until the
/// client goes away.
pub async fn on_upgrade(state: AppState, socket: WebSocket, user_id: UserId) {
    let (sink, stream) = socket.split();
    let (tx, rx) = mpsc::channel(state.config.outbound_buffer);
    let mut writer = tokio::spawn(writer_task(sink, rx));

    let conn = Arc::new(ClientConnection::new(tx));
    let conn_id = conn.id();
    if let Some(previous) = state.registry.add(user_id, conn.clone()) {
        info!(
            user_id = %user_id,
            conn_id,
            previous = previous.id(),
            "Connection replaced an existing one"
        );
    }

    let end = run_ingestion(
        user_id,
        conn_id,
        stream,
        state.registry.clone(),
        state.queue.clone(),
    )
    .await;
    debug!(
        user_id = %user_id,
        conn_id,
        connected_ms = conn.age().as_millis() as u64,
        reason = ?end,
        "Connection finished"
    );

    if end == IngestEnd::QueueClosed {
        conn.close(CLOSE_GOING_AWAY, "server shutting down");
    }

    // The writer stops once the last handle is gone; closing the sink flushes
    // any pending close reply.
    drop(conn);
    if tokio::time::timeout(state.config.write_timeout, &mut writer)
        .await
        .is_err()
    {
        debug!(user_id = %user_id, conn_id, "Writer did not finish in time");
        writer.abort();
    }
}

/// Owns the socket sink and forwards queued frames to it, in order.
async fn writer_task(mut sink: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Message>) {
    while let Some(msg) = rx.recv().await {
        let closing = matches!(msg, Message::Close(_));
        if sink.send(msg).await.is_err() || closing {
            break;
        }
    }
    let _ = sink.close().await;
}

//! The single consumer of the ingestion queue.
//!
//! For every queued message the dispatcher persists it, reads the stored
//! record back, resolves the owning server's members and writes the encoded
//! record to each member that is connected.  Messages are handled strictly
//! one after another so stored ids follow queue order.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use chatter_shared::{InboundMessage, MessageId, UserId};

use crate::directory::{MessageStore, ServerDirectory, TabDirectory};
use crate::registry::ConnectionRegistry;

/// A decoded inbound message tagged with the identity of the connection it
/// arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub sender: UserId,
    pub message: InboundMessage,
}

/// Bounded multi-producer queue feeding the dispatcher.
pub fn message_queue(
    capacity: usize,
) -> (mpsc::Sender<QueuedMessage>, mpsc::Receiver<QueuedMessage>) {
    mpsc::channel(capacity)
}

/// What happened to one dequeued message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Persisting failed; nothing was delivered.
    Dropped,
    /// Stored, but the record or its recipients could not be resolved.
    Undelivered { id: MessageId },
    /// Stored and written to every connected member.
    Delivered {
        id: MessageId,
        recipients: usize,
        failed: usize,
    },
}

pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    messages: Arc<dyn MessageStore>,
    tabs: Arc<dyn TabDirectory>,
    servers: Arc<dyn ServerDirectory>,
    write_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        messages: Arc<dyn MessageStore>,
        tabs: Arc<dyn TabDirectory>,
        servers: Arc<dyn ServerDirectory>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            messages,
            tabs,
            servers,
            write_timeout,
        }
    }

    /// Drain `queue` until it closes.
    ///
    /// When `shutdown` fires the queue is closed to new senders and whatever
    /// is already buffered is still dispatched before returning.
    pub async fn run(
        self,
        mut queue: mpsc::Receiver<QueuedMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Dispatcher started");

        loop {
            tokio::select! {
                next = queue.recv() => match next {
                    Some(item) => {
                        self.dispatch(item).await;
                    }
                    None => break,
                },
                _ = shutdown.changed() => {
                    queue.close();
                    let mut drained = 0usize;
                    while let Some(item) = queue.recv().await {
                        self.dispatch(item).await;
                        drained += 1;
                    }
                    info!(drained, "Dispatcher drained queue for shutdown");
                    break;
                }
            }
        }

        info!("Dispatcher stopped");
    }

    /// Persist, resolve and fan out a single message.
    pub async fn dispatch(&self, item: QueuedMessage) -> DispatchOutcome {
        let QueuedMessage { sender, message } = item;
        let tab_id = message.tab.id;

        let id = match self
            .messages
            .create(sender, tab_id, &message.text, Utc::now())
            .await
        {
            Ok(id) => id,
            Err(e) => {
                error!(
                    user_id = %sender,
                    tab_id = %tab_id,
                    error = %e,
                    "Could not persist message, dropping"
                );
                return DispatchOutcome::Dropped;
            }
        };

        let stored = match self.messages.get_by_id(id).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(message_id = %id, error = %e, "Could not read back stored message");
                return DispatchOutcome::Undelivered { id };
            }
        };

        let tab = match self.tabs.get_by_id(tab_id).await {
            Ok(tab) => tab,
            Err(e) => {
                warn!(
                    message_id = %id,
                    tab_id = %tab_id,
                    error = %e,
                    "Could not resolve message tab"
                );
                return DispatchOutcome::Undelivered { id };
            }
        };

        let members = match self.servers.get_members(tab.server_id).await {
            Ok(members) => members,
            Err(e) => {
                warn!(
                    message_id = %id,
                    server_id = %tab.server_id,
                    error = %e,
                    "Could not resolve server members"
                );
                return DispatchOutcome::Undelivered { id };
            }
        };

        let frame = match stored.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(message_id = %id, error = %e, "Message failed to encode");
                return DispatchOutcome::Undelivered { id };
            }
        };

        let (recipients, failed) = self.deliver(id, &members, frame).await;
        debug!(
            message_id = %id,
            server_id = %tab.server_id,
            members = members.len(),
            recipients,
            failed,
            "Message delivered"
        );

        DispatchOutcome::Delivered {
            id,
            recipients,
            failed,
        }
    }

    /// Write `frame` to every connected member.  Returns how many writes were
    /// attempted and how many of those failed.
    async fn deliver(
        &self,
        id: MessageId,
        members: &HashSet<UserId>,
        frame: String,
    ) -> (usize, usize) {
        let snapshot = self.registry.snapshot();

        let writes = snapshot
            .iter()
            .filter(|(user_id, _)| members.contains(user_id))
            .map(|(user_id, conn)| {
                let frame = frame.clone();
                async move {
                    let result = conn.write_text(frame, self.write_timeout).await;
                    if let Err(e) = &result {
                        warn!(
                            message_id = %id,
                            user_id = %user_id,
                            conn_id = conn.id(),
                            error = %e,
                            "Failed to write message to client"
                        );
                    }
                    result.is_ok()
                }
            });

        let results = join_all(writes).await;
        let failed = results.iter().filter(|ok| !**ok).count();
        (results.len(), failed)
    }
}

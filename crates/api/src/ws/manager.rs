use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::Message;
use herald_core::types::Timestamp;
use herald_events::{Event, Fanout};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

use crate::ws::protocol::ServerFrame;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::Sender<Message>;

/// Default outbound buffer per connection.
const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Bounded channel feeding this connection's writer task.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Connections plus the two reciprocal subscription indexes.
///
/// Always mutated under a single write lock so `by_event` and `by_conn`
/// never disagree.
#[derive(Default)]
struct Registry {
    connections: HashMap<String, WsConnection>,
    by_event: HashMap<String, HashSet<String>>,
    by_conn: HashMap<String, HashSet<String>>,
}

impl Registry {
    /// Drop a connection and every subscription it owns. Returns how many
    /// subscriptions were removed.
    fn remove_connection(&mut self, conn_id: &str) -> usize {
        self.connections.remove(conn_id);
        let Some(event_names) = self.by_conn.remove(conn_id) else {
            return 0;
        };
        for event_name in &event_names {
            if let Some(conns) = self.by_event.get_mut(event_name) {
                conns.remove(conn_id);
                if conns.is_empty() {
                    self.by_event.remove(event_name);
                }
            }
        }
        event_names.len()
    }
}

/// Manages live WebSocket connections and their event subscriptions.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
///
/// Outbound delivery never blocks on a slow client: broadcasts use
/// `try_send`, so a full buffer drops the frame for that connection only and
/// a closed buffer prunes the connection.
pub struct WsManager {
    registry: RwLock<Registry>,
    outbound_capacity: usize,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_OUTBOUND_CAPACITY)
    }

    /// Create a manager whose connections buffer up to `outbound_capacity`
    /// frames each.
    pub fn with_capacity(outbound_capacity: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            outbound_capacity: outbound_capacity.max(1),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink. Re-using an existing ID
    /// replaces that connection and discards its subscriptions.
    pub async fn add(&self, conn_id: String) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        let conn = WsConnection {
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        let mut registry = self.registry.write().await;
        registry.remove_connection(&conn_id);
        registry.connections.insert(conn_id, conn);
        rx
    }

    /// Remove a connection and all of its subscriptions.
    ///
    /// Returns the number of subscriptions that were dropped.
    pub async fn remove(&self, conn_id: &str) -> usize {
        self.registry.write().await.remove_connection(conn_id)
    }

    /// Subscribe a connection to `event_name`.
    ///
    /// Returns `false` if the connection is unknown. Subscribing twice is
    /// harmless.
    pub async fn subscribe(&self, conn_id: &str, event_name: &str) -> bool {
        let mut registry = self.registry.write().await;
        if !registry.connections.contains_key(conn_id) {
            return false;
        }
        registry
            .by_event
            .entry(event_name.to_string())
            .or_default()
            .insert(conn_id.to_string());
        registry
            .by_conn
            .entry(conn_id.to_string())
            .or_default()
            .insert(event_name.to_string());
        true
    }

    /// Unsubscribe a connection from `event_name`.
    ///
    /// Returns `true` if the subscription existed.
    pub async fn unsubscribe(&self, conn_id: &str, event_name: &str) -> bool {
        let mut registry = self.registry.write().await;

        let removed = match registry.by_event.get_mut(event_name) {
            Some(conns) => {
                let removed = conns.remove(conn_id);
                if conns.is_empty() {
                    registry.by_event.remove(event_name);
                }
                removed
            }
            None => false,
        };

        if let Some(names) = registry.by_conn.get_mut(conn_id) {
            names.remove(event_name);
            if names.is_empty() {
                registry.by_conn.remove(conn_id);
            }
        }

        removed
    }

    /// Queue a message for one connection, waiting for buffer space.
    ///
    /// Used for replies to the connection's own control frames. Returns
    /// `false` if the connection is gone.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        let sender = match self.registry.read().await.connections.get(conn_id) {
            Some(conn) => conn.sender.clone(),
            None => return false,
        };
        sender.send(message).await.is_ok()
    }

    /// Push an event frame to every connection subscribed to `event_name`.
    ///
    /// Returns the number of connections the frame was queued for.
    pub async fn broadcast_event(&self, event_name: &str, payload: &serde_json::Value) -> usize {
        let message = match (ServerFrame::Event {
            event_name,
            payload,
        })
        .to_message()
        {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, event_name = %event_name, "Failed to encode event frame");
                return 0;
            }
        };

        let targets: Vec<(String, WsSender)> = {
            let registry = self.registry.read().await;
            let Some(conn_ids) = registry.by_event.get(event_name) else {
                return 0;
            };
            conn_ids
                .iter()
                .filter_map(|id| {
                    registry
                        .connections
                        .get(id)
                        .map(|conn| (id.clone(), conn.sender.clone()))
                })
                .collect()
        };

        let mut delivered = 0;
        let mut stale = Vec::new();
        for (conn_id, sender) in targets {
            match sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        conn_id = %conn_id,
                        event_name = %event_name,
                        "WebSocket outbound buffer full, dropping frame"
                    );
                }
                Err(TrySendError::Closed(_)) => stale.push(conn_id),
            }
        }

        if !stale.is_empty() {
            let mut registry = self.registry.write().await;
            for conn_id in &stale {
                registry.remove_connection(conn_id);
                tracing::debug!(conn_id = %conn_id, "Pruned stale WebSocket connection");
            }
        }

        delivered
    }

    /// Broadcast a message to all connected clients.
    ///
    /// Connections whose buffers are full or closed are skipped (closed ones
    /// are cleaned up by their own receive loop).
    pub async fn broadcast(&self, message: Message) {
        let registry = self.registry.read().await;
        for conn in registry.connections.values() {
            let _ = conn.sender.try_send(message.clone());
        }
    }

    /// How long `conn_id` has been connected, if it is still registered.
    pub async fn connection_age(&self, conn_id: &str) -> Option<chrono::Duration> {
        self.registry
            .read()
            .await
            .connections
            .get(conn_id)
            .map(|conn| chrono::Utc::now() - conn.connected_at)
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.connections.len()
    }

    /// Number of connections subscribed to `event_name`.
    pub async fn subscriber_count(&self, event_name: &str) -> usize {
        self.registry
            .read()
            .await
            .by_event
            .get(event_name)
            .map_or(0, HashSet::len)
    }

    /// Event names a connection is subscribed to, sorted.
    pub async fn subscriptions_of(&self, conn_id: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry
            .read()
            .await
            .by_conn
            .get(conn_id)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Send a Close frame to every connection, then clear all state.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut registry = self.registry.write().await;
        let count = registry.connections.len();
        for conn in registry.connections.values() {
            let _ = conn.sender.try_send(Message::Close(None));
        }
        *registry = Registry::default();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        self.broadcast(Message::Ping(Bytes::new())).await;
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fanout for WsManager {
    async fn broadcast(&self, event: &Event) -> usize {
        self.broadcast_event(&event.event_name, &event.payload).await
    }
}

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, Stream, StreamExt};

use crate::state::AppState;
use crate::ws::manager::WsManager;
use crate::ws::protocol::{ClientFrame, ServerFrame};

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by a writer task plus the receive loop on this task.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let send_timeout = state.config.ws_send_timeout();
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager, send_timeout))
}

/// Manage a single WebSocket connection after upgrade.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>, send_timeout: Duration) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let (sink, stream) = socket.split();
    run_connection(conn_id, sink, stream, ws_manager, send_timeout).await;
}

/// Drive one connection over its split sink (outbound) and stream (inbound):
///   1. Registers the connection with `WsManager`.
///   2. Spawns a writer task that forwards queued frames, giving each write
///      at most `send_timeout`. A stalled or failed write ends the task.
///   3. Processes inbound control frames until either side ends.
///   4. Removes the connection and all of its subscriptions.
async fn run_connection<W, R, E>(
    conn_id: String,
    mut sink: W,
    mut stream: R,
    ws_manager: Arc<WsManager>,
    send_timeout: Duration,
) where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display + Send,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut rx = ws_manager.add(conn_id.clone()).await;

    let writer_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match tokio::time::timeout(send_timeout, sink.send(msg)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::debug!(conn_id = %writer_conn_id, error = %e, "WebSocket sink closed");
                    break;
                }
                Err(_) => {
                    tracing::warn!(conn_id = %writer_conn_id, "WebSocket send timed out, dropping client");
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut send_task => {
                break;
            }
            next = stream.next() => match next {
                Some(Ok(Message::Text(text))) => {
                    handle_control_frame(&ws_manager, &conn_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Pong(_))) => {
                    tracing::trace!(conn_id = %conn_id, "Pong received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    let connected_secs = ws_manager
        .connection_age(&conn_id)
        .await
        .map_or(0, |age| age.num_seconds());
    let dropped = ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(
        conn_id = %conn_id,
        subscriptions = dropped,
        connected_secs,
        "WebSocket disconnected"
    );
}

/// Apply one client control frame and queue the reply.
async fn handle_control_frame(ws_manager: &WsManager, conn_id: &str, text: &str) {
    let reply = match ClientFrame::parse(text) {
        Ok(ClientFrame::Subscribe(event_name)) => {
            ws_manager.subscribe(conn_id, &event_name).await;
            tracing::debug!(conn_id = %conn_id, event_name = %event_name, "Subscribed");
            ServerFrame::Subscribed {
                subscribed: &event_name,
            }
            .to_message()
        }
        Ok(ClientFrame::Unsubscribe(event_name)) => {
            ws_manager.unsubscribe(conn_id, &event_name).await;
            tracing::debug!(conn_id = %conn_id, event_name = %event_name, "Unsubscribed");
            ServerFrame::Unsubscribed {
                unsubscribed: &event_name,
            }
            .to_message()
        }
        Err(e) => {
            tracing::debug!(conn_id = %conn_id, error = %e, "Rejected control frame");
            ServerFrame::from(e).to_message()
        }
    };

    match reply {
        Ok(message) => {
            ws_manager.send_to(conn_id, message).await;
        }
        Err(e) => {
            tracing::error!(conn_id = %conn_id, error = %e, "Failed to encode reply frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use futures::stream;
    use serde_json::json;

    use super::*;

    /// Outbound half that either never accepts a frame or rejects every one.
    struct TestSink {
        fail: bool,
    }

    impl Sink<Message> for TestSink {
        type Error = String;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
            if self.fail {
                Poll::Ready(Err("connection reset".into()))
            } else {
                Poll::Pending
            }
        }

        fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), String> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Ready(Ok(()))
        }
    }

    fn idle_stream() -> stream::Pending<Result<Message, String>> {
        stream::pending()
    }

    async fn wait_for_connections(manager: &WsManager, expected: usize) {
        for _ in 0..100 {
            if manager.connection_count().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("connection count never reached {expected}");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_writer_is_dropped_and_others_keep_receiving() {
        let manager = Arc::new(WsManager::new());
        let mut fast = manager.add("fast".to_string()).await;
        manager.subscribe("fast", "x").await;

        let slow = tokio::spawn(run_connection(
            "slow".to_string(),
            TestSink { fail: false },
            idle_stream(),
            Arc::clone(&manager),
            Duration::from_secs(1),
        ));
        wait_for_connections(&manager, 2).await;
        manager.subscribe("slow", "x").await;

        assert_eq!(manager.broadcast_event("x", &json!({"n": 1})).await, 2);

        tokio::time::timeout(Duration::from_secs(5), slow)
            .await
            .expect("stalled connection should be dropped after the send timeout")
            .unwrap();

        assert_eq!(manager.connection_count().await, 1);
        assert_eq!(manager.subscriber_count("x").await, 1);
        assert!(manager.subscriptions_of("slow").await.is_empty());
        assert!(fast.try_recv().is_ok());

        assert_eq!(manager.broadcast_event("x", &json!({"n": 2})).await, 1);
        assert!(fast.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_removes_connection() {
        let manager = Arc::new(WsManager::new());

        let conn = tokio::spawn(run_connection(
            "broken".to_string(),
            TestSink { fail: true },
            idle_stream(),
            Arc::clone(&manager),
            Duration::from_secs(5),
        ));
        wait_for_connections(&manager, 1).await;
        manager.subscribe("broken", "x").await;

        manager.broadcast_event("x", &json!({})).await;

        tokio::time::timeout(Duration::from_secs(1), conn)
            .await
            .expect("failed write should end the connection")
            .unwrap();
        assert_eq!(manager.connection_count().await, 0);
        assert_eq!(manager.subscriber_count("x").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_stream_removes_subscriptions() {
        let manager = Arc::new(WsManager::new());
        let inbound = stream::iter(vec![Ok::<_, String>(Message::Text(
            r#"{"action":"subscribe","event_name":"x"}"#.into(),
        ))]);

        run_connection(
            "short".to_string(),
            TestSink { fail: false },
            inbound,
            Arc::clone(&manager),
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(manager.connection_count().await, 0);
        assert_eq!(manager.subscriber_count("x").await, 0);
    }
}

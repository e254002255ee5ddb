//! Concrete [`EventHandler`] implementations.

use std::future::Future;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::registry::{EventHandler, HandlerError};
use crate::Event;

/// Writes every received event to the structured log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

#[async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        tracing::info!(
            event_id = event.id,
            event_name = %event.event_name,
            source = %event.source,
            status = event.status.as_str(),
            payload = %event.payload,
            "Event received"
        );
        Ok(())
    }
}

/// Forwards a copy of every received event into an mpsc channel.
///
/// Fails with [`HandlerError::ChannelClosed`] once the receiver is dropped.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    sender: mpsc::UnboundedSender<Event>,
}

impl ChannelHandler {
    /// Create a handler and the receiver that observes its events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventHandler for ChannelHandler {
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        self.sender
            .send(event.clone())
            .map_err(|_| HandlerError::ChannelClosed)
    }
}

/// Adapts an async closure into an [`EventHandler`]. Built with [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

/// Wrap `f` as an [`EventHandler`].
///
/// ```ignore
/// registry
///     .register("order.created", Arc::new(handler_fn(|event| async move {
///         tracing::info!(id = event.id, "order created");
///         Ok(())
///     })))
///     .await;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        (self.f)(event.clone()).await
    }
}

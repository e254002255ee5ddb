//! In-process subscriber registry.
//!
//! [`SubscriberRegistry`] maps event names to the [`EventHandler`]s that
//! want them. Handlers are registered at startup and live for the process
//! lifetime; there is no unregister.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::RwLock;

use crate::Event;

/// Error raised by a single handler invocation.
///
/// Always contained by [`SubscriberRegistry::notify`]; never reaches the
/// publisher or other handlers.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Handler channel closed")]
    ChannelClosed,

    #[error("Handler panicked: {0}")]
    Panicked(String),
}

/// A subscriber that reacts to events of one or more names.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event) -> Result<(), HandlerError>;
}

/// Outcome of a single [`SubscriberRegistry::notify`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Handlers invoked.
    pub invoked: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

/// Event name → handlers, safe to share via `Arc` across tasks.
#[derive(Default)]
pub struct SubscriberRegistry {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `handler` for every future notification of `event_name`.
    ///
    /// Registering the same handler twice makes it run twice per event.
    pub async fn register(&self, event_name: impl Into<String>, handler: Arc<dyn EventHandler>) {
        let event_name = event_name.into();
        tracing::debug!(event_name = %event_name, "Registering event handler");
        self.handlers
            .write()
            .await
            .entry(event_name)
            .or_default()
            .push(handler);
    }

    /// Number of handlers registered for `event_name`.
    pub async fn handler_count(&self, event_name: &str) -> usize {
        self.handlers
            .read()
            .await
            .get(event_name)
            .map_or(0, Vec::len)
    }

    /// Invoke every handler registered for `event.event_name`, in
    /// registration order.
    ///
    /// The handler list is snapshotted before any handler runs, so handlers
    /// may call back into the registry. Failures and panics are logged and
    /// counted; the remaining handlers still run.
    pub async fn notify(&self, event: &Event) -> NotifyReport {
        let handlers = match self.handlers.read().await.get(&event.event_name) {
            Some(list) => list.clone(),
            None => return NotifyReport::default(),
        };

        let mut report = NotifyReport::default();
        for handler in handlers {
            report.invoked += 1;
            let outcome = AssertUnwindSafe(handler.handle(event))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic))));

            if let Err(e) = outcome {
                report.failed += 1;
                tracing::error!(
                    error = %e,
                    event_id = event.id,
                    event_name = %event.event_name,
                    "Event handler failed"
                );
            }
        }
        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

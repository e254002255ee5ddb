//! Publish gateway: the synchronous entry point for new events.
//!
//! [`EventGateway::publish`] stores the event durably, then delivers it to
//! in-process subscribers and hands it to the live [`Fanout`]. The gateway
//! marks its own rows `processed` before notifying, so the
//! [`Dispatcher`](crate::Dispatcher) only replays rows written by other
//! paths (or rows whose mark failed).

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::error::CoreError;
use herald_core::event::NewEvent;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::registry::SubscriberRegistry;
use crate::store::{EventStore, StoreError};
use crate::{Event, EventStatus};

/// Relays a freshly published event to live connections.
///
/// Implementations contain their own delivery failures; the return value is
/// the number of connections the event was handed to.
#[async_trait]
pub trait Fanout: Send + Sync {
    async fn broadcast(&self, event: &Event) -> usize;
}

/// Coordinates the gateway and the dispatcher scan.
///
/// Publishers hold it shared across append + mark; the dispatcher holds it
/// exclusively while it reads `new` rows. A row is therefore never seen by
/// the dispatcher between the gateway's append and its mark.
#[derive(Clone, Default)]
pub struct PublishGate {
    lock: Arc<RwLock<()>>,
}

impl PublishGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publishing(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().await
    }

    pub async fn scanning(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().await
    }
}

/// Reasons a publish is rejected. Downstream delivery failures are never
/// reported here.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stores, notifies, and fans out published events.
pub struct EventGateway {
    store: Arc<dyn EventStore>,
    registry: Arc<SubscriberRegistry>,
    gate: PublishGate,
    fanout: Option<Arc<dyn Fanout>>,
}

impl EventGateway {
    pub fn new(
        store: Arc<dyn EventStore>,
        registry: Arc<SubscriberRegistry>,
        gate: PublishGate,
    ) -> Self {
        Self {
            store,
            registry,
            gate,
            fanout: None,
        }
    }

    /// Attach the live-connection fanout.
    pub fn with_fanout(mut self, fanout: Arc<dyn Fanout>) -> Self {
        self.fanout = Some(fanout);
        self
    }

    /// Validate, persist, and deliver a new event.
    ///
    /// Durability precedes delivery: a failed append fails the whole
    /// publish and nothing is delivered. Once the row exists, handler and
    /// fanout failures are contained and the publish still succeeds.
    pub async fn publish(
        &self,
        event_name: &str,
        payload: serde_json::Value,
        source: &str,
    ) -> Result<Event, PublishError> {
        let new_event = NewEvent::validated(event_name, payload, source)?;

        let (mut event, claimed) = {
            let _gate = self.gate.publishing().await;
            let event = self.store.append(&new_event).await?;
            let claimed = match self.store.mark_processed(event.id).await {
                Ok(claimed) => claimed,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        event_id = event.id,
                        "Failed to mark published event, leaving it to the dispatcher"
                    );
                    false
                }
            };
            (event, claimed)
        };

        tracing::info!(
            event_id = event.id,
            event_name = %event.event_name,
            source = %event.source,
            "Event published"
        );

        if claimed {
            event.status = EventStatus::Processed;
            let report = self.registry.notify(&event).await;
            if report.failed > 0 {
                tracing::warn!(
                    event_id = event.id,
                    failed = report.failed,
                    invoked = report.invoked,
                    "Some event handlers failed"
                );
            }
        }

        if let Some(fanout) = &self.fanout {
            let delivered = fanout.broadcast(&event).await;
            tracing::debug!(event_id = event.id, delivered, "Event fanned out");
        }

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::handlers::ChannelHandler;
    use crate::store::memory::MemoryEventStore;

    #[derive(Default)]
    struct CountingFanout {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fanout for CountingFanout {
        async fn broadcast(&self, _event: &Event) -> usize {
            self.calls.fetch_add(1, Ordering::SeqCst);
            0
        }
    }

    fn gateway(store: Arc<MemoryEventStore>, registry: Arc<SubscriberRegistry>) -> EventGateway {
        EventGateway::new(store, registry, PublishGate::new())
    }

    #[tokio::test]
    async fn publish_stores_marks_and_notifies() {
        let store = Arc::new(MemoryEventStore::new());
        let registry = Arc::new(SubscriberRegistry::new());
        let (handler, mut rx) = ChannelHandler::new();
        registry.register("job.done", Arc::new(handler)).await;
        let fanout = Arc::new(CountingFanout::default());

        let gateway = gateway(store.clone(), registry).with_fanout(fanout.clone());
        let event = gateway
            .publish("job.done", json!({"id": 42}), "api")
            .await
            .unwrap();

        assert_eq!(event.status, EventStatus::Processed);
        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, event.id);
        assert_eq!(received.payload["id"], 42);
        assert_eq!(fanout.calls.load(Ordering::SeqCst), 1);

        let stored = store.list(Some("job.done")).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, EventStatus::Processed);
        assert_eq!(stored[0].source, "api");
    }

    #[tokio::test]
    async fn empty_name_is_rejected_without_a_write() {
        let store = Arc::new(MemoryEventStore::new());
        let gateway = gateway(store.clone(), Arc::new(SubscriberRegistry::new()));

        let err = gateway.publish("", json!({}), "api").await.unwrap_err();

        assert_matches!(err, PublishError::Invalid(CoreError::Validation(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn store_failure_fails_publish_and_skips_delivery() {
        let store = Arc::new(MemoryEventStore::new());
        store.set_unavailable(true);
        let registry = Arc::new(SubscriberRegistry::new());
        let (handler, mut rx) = ChannelHandler::new();
        registry.register("job.done", Arc::new(handler)).await;
        let fanout = Arc::new(CountingFanout::default());

        let gateway = gateway(store, registry).with_fanout(fanout.clone());
        let err = gateway
            .publish("job.done", json!({}), "api")
            .await
            .unwrap_err();

        assert_matches!(err, PublishError::Store(StoreError::Unavailable(_)));
        assert!(rx.try_recv().is_err());
        assert_eq!(fanout.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_failure_does_not_fail_publish() {
        let store = Arc::new(MemoryEventStore::new());
        let registry = Arc::new(SubscriberRegistry::new());
        let (handler, rx) = ChannelHandler::new();
        drop(rx);
        registry.register("job.done", Arc::new(handler)).await;

        let gateway = gateway(store, registry);
        assert!(gateway.publish("job.done", json!({}), "api").await.is_ok());
    }
}

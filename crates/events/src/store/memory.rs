//! In-memory [`EventStore`] for tests and database-less deployments.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use herald_core::event::NewEvent;
use herald_core::types::DbId;
use tokio::sync::Mutex;

use super::{EventStore, StoreError};
use crate::{Event, EventStatus};

#[derive(Default)]
struct Inner {
    last_id: DbId,
    events: Vec<Event>,
}

/// Process-local event log with the same contract as the Postgres store.
///
/// [`set_unavailable`](MemoryEventStore::set_unavailable) makes every call
/// fail with [`StoreError::Unavailable`], which is how tests simulate an
/// unreachable database.
#[derive(Default)]
pub struct MemoryEventStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored rows, regardless of status.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: &NewEvent) -> Result<Event, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        inner.last_id += 1;
        let stored = Event {
            id: inner.last_id,
            event_name: event.event_name.clone(),
            payload: event.payload.clone(),
            created_at: chrono::Utc::now(),
            source: event.source.clone(),
            status: EventStatus::New,
        };
        inner.events.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, event_name: Option<&str>) -> Result<Vec<Event>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .events
            .iter()
            .filter(|e| event_name.map_or(true, |name| e.event_name == name))
            .cloned()
            .collect())
    }

    async fn list_new(&self, limit: usize) -> Result<Vec<Event>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .events
            .iter()
            .filter(|e| e.status == EventStatus::New)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, id: DbId) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        match inner.events.iter_mut().find(|e| e.id == id) {
            Some(event) if event.status == EventStatus::New => {
                event.status = EventStatus::Processed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

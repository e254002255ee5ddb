//! Postgres-backed [`EventStore`].

use async_trait::async_trait;
use herald_core::event::NewEvent;
use herald_core::types::DbId;
use herald_db::repositories::EventRepo;
use herald_db::DbPool;

use super::{EventStore, StoreError};
use crate::Event;

/// [`EventStore`] over the `events` table.
#[derive(Clone)]
pub struct PgEventStore {
    pool: DbPool,
}

impl PgEventStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(&self, event: &NewEvent) -> Result<Event, StoreError> {
        Ok(EventRepo::insert(&self.pool, event).await?)
    }

    async fn list(&self, event_name: Option<&str>) -> Result<Vec<Event>, StoreError> {
        Ok(EventRepo::list(&self.pool, event_name).await?)
    }

    async fn list_new(&self, limit: usize) -> Result<Vec<Event>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Ok(EventRepo::list_new(&self.pool, limit).await?)
    }

    async fn mark_processed(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(EventRepo::mark_processed(&self.pool, id).await?)
    }
}

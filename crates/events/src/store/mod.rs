//! Durable event log.
//!
//! [`EventStore`] is the single source of truth for "what happened". Rows are
//! appended with status `new`; only the delivery paths move them to
//! `processed`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use herald_core::event::NewEvent;
use herald_core::types::DbId;

use crate::Event;

/// Failure to read from or write to the durable store.
///
/// Callers must not assume delivery happened when an append fails.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Event store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence operations over the event log.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a new row with status `new` and return it with its assigned
    /// id and timestamp.
    async fn append(&self, event: &NewEvent) -> Result<Event, StoreError>;

    /// All rows in insertion order, optionally filtered by exact name.
    async fn list(&self, event_name: Option<&str>) -> Result<Vec<Event>, StoreError>;

    /// Oldest-first batch of rows still marked `new`.
    async fn list_new(&self, limit: usize) -> Result<Vec<Event>, StoreError>;

    /// Move a row from `new` to `processed`.
    ///
    /// Returns `true` only if this call performed the transition. Re-marking
    /// a processed row is a no-op that returns `false`.
    async fn mark_processed(&self, id: DbId) -> Result<bool, StoreError>;
}

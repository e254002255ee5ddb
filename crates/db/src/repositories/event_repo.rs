//! Repository for the `events` table.

use herald_core::event::NewEvent;
use herald_core::types::DbId;
use sqlx::PgPool;

use crate::models::event::Event;

/// Column list for `events` queries.
const EVENT_COLUMNS: &str = "id, event_name, payload, created_at, source, status";

/// Provides read/write operations for the durable event log.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new event with status `new`, returning the stored row.
    pub async fn insert(pool: &PgPool, event: &NewEvent) -> Result<Event, sqlx::Error> {
        let query = format!(
            "INSERT INTO events (event_name, payload, source) \
             VALUES ($1, $2, $3) \
             RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(&event.event_name)
            .bind(&event.payload)
            .bind(&event.source)
            .fetch_one(pool)
            .await
    }

    /// List events in insertion order, optionally filtered by exact name.
    pub async fn list(pool: &PgPool, event_name: Option<&str>) -> Result<Vec<Event>, sqlx::Error> {
        match event_name {
            Some(name) => {
                let query =
                    format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_name = $1 ORDER BY id");
                sqlx::query_as::<_, Event>(&query)
                    .bind(name)
                    .fetch_all(pool)
                    .await
            }
            None => {
                let query = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY id");
                sqlx::query_as::<_, Event>(&query).fetch_all(pool).await
            }
        }
    }

    /// Oldest-first batch of events still marked `new`.
    pub async fn list_new(pool: &PgPool, limit: i64) -> Result<Vec<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE status = 'new' ORDER BY id LIMIT $1"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Transition an event from `new` to `processed`.
    ///
    /// Returns `true` only when this call performed the transition. An event
    /// that is already processed (or does not exist) yields `false`.
    pub async fn mark_processed(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE events SET status = 'processed' WHERE id = $1 AND status = 'new'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

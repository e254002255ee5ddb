//! Event entity model.

use herald_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Delivery lifecycle of a stored event.
///
/// Maps to the `event_status` Postgres enum. The only legal transition is
/// `New -> Processed`; `Processed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    New,
    Processed,
}

impl EventStatus {
    /// Label matching the Postgres enum value.
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::New => "new",
            EventStatus::Processed => "processed",
        }
    }
}

/// A row from the `events` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: DbId,
    pub event_name: String,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub source: String,
    pub status: EventStatus,
}

impl Event {
    pub fn is_processed(&self) -> bool {
        self.status == EventStatus::Processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(EventStatus::New).unwrap(), "new");
        assert_eq!(
            serde_json::to_value(EventStatus::Processed).unwrap(),
            "processed"
        );
        assert_eq!(EventStatus::Processed.as_str(), "processed");
    }

    #[test]
    fn event_serializes_iso_timestamp() {
        let created_at = "2026-03-01T12:00:00Z".parse().unwrap();
        let event = Event {
            id: 1,
            event_name: "job.done".into(),
            payload: serde_json::json!({"id": 42}),
            created_at,
            source: "api".into(),
            status: EventStatus::New,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["created_at"], "2026-03-01T12:00:00Z");
        assert_eq!(json["status"], "new");
        assert_eq!(json["payload"]["id"], 42);
    }
}

//! Validated input for appending a new event.
//!
//! [`NewEvent`] is the only way callers hand an event to the store, so every
//! persisted row has passed the same name/source/payload checks.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::CoreError;

/// Source tag for events published through the HTTP API.
pub const SOURCE_API: &str = "api";

/// Default source tag for events written by internal code paths.
pub const SOURCE_SYSTEM: &str = "system";

/// Message returned when an event name is absent or blank.
pub const MISSING_EVENT_NAME: &str = "Missing event_name";

/// An event that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewEvent {
    /// Dot-separated event name, e.g. `"order.created"`.
    #[validate(custom(function = "validate_event_name"))]
    pub event_name: String,

    /// Free-form JSON object carrying event-specific data.
    #[validate(custom(function = "validate_payload"))]
    pub payload: serde_json::Value,

    /// Origin tag, e.g. `"api"` or `"system"`.
    #[validate(length(min = 1, message = "source must not be empty"))]
    pub source: String,
}

impl NewEvent {
    /// Build and validate a new event in one step.
    pub fn validated(
        event_name: impl Into<String>,
        payload: serde_json::Value,
        source: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let event = Self {
            event_name: event_name.into(),
            payload,
            source: source.into(),
        };
        event.validate().map_err(into_core_error)?;
        Ok(event)
    }
}

fn validate_event_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("event_name").with_message(MISSING_EVENT_NAME.into()));
    }
    Ok(())
}

fn validate_payload(payload: &serde_json::Value) -> Result<(), ValidationError> {
    if !payload.is_object() {
        return Err(
            ValidationError::new("payload").with_message("payload must be a JSON object".into())
        );
    }
    Ok(())
}

/// Collapse validator output into a single human-readable message.
///
/// Fields are visited in name order so the reported message is stable when
/// more than one field fails.
fn into_core_error(errors: ValidationErrors) -> CoreError {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().cloned().collect();
    fields.sort();

    let message = fields
        .iter()
        .filter_map(|field| field_errors.get(field))
        .flat_map(|errs| errs.iter())
        .map(|err| match &err.message {
            Some(msg) => msg.to_string(),
            None => format!("invalid {}", err.code),
        })
        .next()
        .unwrap_or_else(|| "invalid event".to_string());

    CoreError::Validation(message)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn valid_event_passes() {
        let event = NewEvent::validated("job.done", json!({"id": 42}), SOURCE_API).unwrap();
        assert_eq!(event.event_name, "job.done");
        assert_eq!(event.payload["id"], 42);
        assert_eq!(event.source, "api");
    }

    #[test]
    fn empty_event_name_is_rejected() {
        let err = NewEvent::validated("", json!({}), SOURCE_API).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg == MISSING_EVENT_NAME);
    }

    #[test]
    fn blank_event_name_is_rejected() {
        let err = NewEvent::validated("   ", json!({}), SOURCE_API).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg == MISSING_EVENT_NAME);
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = NewEvent::validated("job.done", json!([1, 2, 3]), SOURCE_API).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("payload"));
    }

    #[test]
    fn empty_source_is_rejected() {
        let err = NewEvent::validated("job.done", json!({}), "").unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("source"));
    }

    #[test]
    fn event_name_error_wins_over_payload_error() {
        // "event_name" sorts before "payload".
        let err = NewEvent::validated("", json!("nope"), SOURCE_API).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg == MISSING_EVENT_NAME);
    }
}

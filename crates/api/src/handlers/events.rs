//! Handlers for the event bus HTTP surface.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use herald_core::error::CoreError;
use herald_core::event::SOURCE_API;
use herald_events::{Event, EventStore, PublishError};
use serde::{Deserialize, Serialize};

use crate::auth::AuthPrincipal;
use crate::error::{AppError, AppResult};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Message returned by the HTTP subscription endpoints.
const USE_WEBSOCKET: &str = "Use WebSocket for real-time subscriptions.";

/// Body for `POST /publish`.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub event_name: Option<String>,
    /// Defaults to `{}` when absent.
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct PublishedEvent {
    pub id: herald_core::types::DbId,
}

/// Query parameters for `GET /events`.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Exact name filter. An empty value lists everything.
    pub event_name: Option<String>,
}

/// POST /api/v1/publish
///
/// Durably store an event, then notify in-process subscribers and push it to
/// subscribed WebSocket clients.
///
/// An invalid event (missing name, non-object payload) answers 200 with
/// `{"status": "error", "message": ...}` and stores nothing.
pub async fn publish(
    auth: AuthPrincipal,
    State(state): State<AppState>,
    body: Result<Json<PublishRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<PublishedEvent>>> {
    let Json(body) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let event_name = body.event_name.unwrap_or_default();
    let payload = body
        .payload
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

    let event = match state.gateway.publish(&event_name, payload, SOURCE_API).await {
        Ok(event) => event,
        Err(PublishError::Invalid(CoreError::Validation(message))) => {
            tracing::debug!(subject = %auth.0.subject, error = %message, "Publish rejected");
            return Ok(Json(ApiResponse::error(message)));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::debug!(
        subject = %auth.0.subject,
        event_id = event.id,
        "Publish accepted"
    );

    Ok(Json(
        ApiResponse::ok(PublishedEvent { id: event.id })
            .with_message(format!("Event '{}' published.", event.event_name)),
    ))
}

/// GET /api/v1/events
///
/// List stored events in insertion order, optionally filtered by name.
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventsQuery>,
) -> AppResult<Json<ApiResponse<Vec<Event>>>> {
    let filter = params.event_name.as_deref().filter(|name| !name.is_empty());
    let events = state.store.list(filter).await?;
    Ok(Json(ApiResponse::ok(events)))
}

/// POST /api/v1/subscribe
///
/// HTTP clients cannot hold a subscription; point them at `/ws`.
pub async fn subscribe_info() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message(USE_WEBSOCKET))
}

/// POST /api/v1/unsubscribe
pub async fn unsubscribe_info() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message(USE_WEBSOCKET))
}

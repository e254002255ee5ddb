pub mod events;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                 WebSocket (subscribe / unsubscribe / live pushes)
/// /publish            publish an event (POST)
/// /events             list stored events (GET, ?event_name=)
/// /subscribe          informational (POST)
/// /unsubscribe        informational (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(events::router())
}

//! Route definitions for the event bus.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;
use crate::ws;

/// Event bus routes, mounted at `/api/v1`.
///
/// ```text
/// POST   /publish        -> publish
/// GET    /events         -> list_events
/// POST   /subscribe      -> subscribe_info
/// POST   /unsubscribe    -> unsubscribe_info
/// GET    /ws             -> ws_handler
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/publish", post(events::publish))
        .route("/events", get(events::list_events))
        .route("/subscribe", post(events::subscribe_info))
        .route("/unsubscribe", post(events::unsubscribe_info))
        .route("/ws", get(ws::ws_handler))
}

use std::sync::Arc;

use herald_events::{EventGateway, EventStore};

use crate::auth::{PrincipalVerifier, SharedSecretVerifier};
use crate::config::ServerConfig;
use crate::services::EventServices;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, when the event log is Postgres-backed.
    pub pool: Option<herald_db::DbPool>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Durable event log (read side for `GET /events`).
    pub store: Arc<dyn EventStore>,
    /// Publish entry point.
    pub gateway: Arc<EventGateway>,
    /// WebSocket connection manager.
    pub ws_manager: Arc<WsManager>,
    /// Publisher verification; `None` admits everyone.
    pub verifier: Option<Arc<dyn PrincipalVerifier>>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        services: &EventServices,
        pool: Option<herald_db::DbPool>,
    ) -> Self {
        let verifier = config
            .api_secret
            .as_deref()
            .map(|secret| Arc::new(SharedSecretVerifier::new(secret)) as Arc<dyn PrincipalVerifier>);

        Self {
            pool,
            config: Arc::new(config),
            store: Arc::clone(&services.store),
            gateway: Arc::clone(&services.gateway),
            ws_manager: Arc::clone(&services.ws_manager),
            verifier,
        }
    }
}

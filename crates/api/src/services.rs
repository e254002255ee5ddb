//! Wiring of the event bus components.
//!
//! [`EventServices`] owns one instance of each component for the lifetime of
//! the process: created at startup, torn down at shutdown.

use std::sync::Arc;

use herald_events::{
    Dispatcher, EventGateway, EventStore, LoggingHandler, PublishGate, SubscriberRegistry,
};

use crate::config::ServerConfig;
use crate::ws::WsManager;

pub struct EventServices {
    pub store: Arc<dyn EventStore>,
    pub registry: Arc<SubscriberRegistry>,
    pub gateway: Arc<EventGateway>,
    pub dispatcher: Arc<Dispatcher>,
    pub ws_manager: Arc<WsManager>,
}

impl EventServices {
    /// Wire the registry, gateway, dispatcher, and WebSocket fanout around
    /// `store`. Nothing is spawned; call [`Dispatcher::start`] separately.
    pub fn new(store: Arc<dyn EventStore>, config: &ServerConfig) -> Self {
        let registry = Arc::new(SubscriberRegistry::new());
        let gate = PublishGate::new();
        let ws_manager = Arc::new(WsManager::with_capacity(config.ws_outbound_capacity));

        let gateway = EventGateway::new(Arc::clone(&store), Arc::clone(&registry), gate.clone())
            .with_fanout(ws_manager.clone());

        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            gate,
            config.dispatcher_config(),
        );

        Self {
            store,
            registry,
            gateway: Arc::new(gateway),
            dispatcher: Arc::new(dispatcher),
            ws_manager,
        }
    }

    /// Register a [`LoggingHandler`] for each configured event name.
    pub async fn register_default_handlers(&self, config: &ServerConfig) {
        for event_name in &config.event_log_names {
            self.registry
                .register(event_name.clone(), Arc::new(LoggingHandler))
                .await;
        }
        if !config.event_log_names.is_empty() {
            tracing::info!(
                count = config.event_log_names.len(),
                "Registered logging handlers"
            );
        }
    }
}

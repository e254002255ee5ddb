//! WebSocket fanout for real-time event delivery.
//!
//! Provides connection and subscription management, the control-frame
//! protocol, heartbeat monitoring, and the HTTP upgrade handler used by
//! Axum routes.

mod handler;
mod heartbeat;
pub mod manager;
pub mod protocol;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;

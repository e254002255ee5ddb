//! Herald event bus.
//!
//! This crate provides the building blocks of the hybrid push/pull event
//! system:
//!
//! - [`EventStore`] — durable event log (Postgres or in-memory).
//! - [`SubscriberRegistry`] — in-process event name → handler map.
//! - [`Dispatcher`] — background loop that delivers rows still marked `new`.
//! - [`EventGateway`] — synchronous publish entry point (store, notify, fan out).
//! - [`Fanout`] — seam for relaying publishes to live connections.

pub mod dispatcher;
pub mod gateway;
pub mod handlers;
pub mod registry;
pub mod store;

pub use dispatcher::{Dispatcher, DispatcherConfig, TickReport};
pub use gateway::{EventGateway, Fanout, PublishError, PublishGate};
pub use handlers::{handler_fn, ChannelHandler, FnHandler, LoggingHandler};
pub use herald_db::models::event::{Event, EventStatus};
pub use registry::{EventHandler, HandlerError, NotifyReport, SubscriberRegistry};
pub use store::memory::MemoryEventStore;
pub use store::postgres::PgEventStore;
pub use store::{EventStore, StoreError};

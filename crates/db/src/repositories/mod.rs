//! Repository layer: stateless query helpers over a [`PgPool`](sqlx::PgPool).

pub mod event_repo;

pub use event_repo::EventRepo;

//! Shared types, errors, and validation for the Herald event bus.

pub mod error;
pub mod event;
pub mod types;

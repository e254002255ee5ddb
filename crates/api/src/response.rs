//! Shared response envelope for API handlers.
//!
//! Every successful response is `{ "status": "ok", "message": ..., "data": ... }`.
//! Rejected publishes use the same shape with `"status": "error"`; transport
//! and server failures go through [`AppError`](crate::error::AppError).

use serde::Serialize;

/// Standard `{ status, message, data }` response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            status: "ok",
            message: "success".to_string(),
            data: Some(data),
        }
    }

    /// Request was understood but refused: `"status": "error"`, no data.
    ///
    /// Sent with HTTP 200, unlike [`AppError`](crate::error::AppError)
    /// responses.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            data: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl ApiResponse<()> {
    /// Successful response with a message and `"data": null`.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: "ok",
            message: message.into(),
            data: None,
        }
    }
}

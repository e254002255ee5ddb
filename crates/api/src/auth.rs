//! Principal verification for publishers.
//!
//! Identity management lives outside this service; the API only asks a
//! [`PrincipalVerifier`] whether a bearer token belongs to a known principal.
//! When no verifier is configured every request is treated as anonymous.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use herald_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".into(),
        }
    }
}

/// Maps a bearer token to a [`Principal`].
pub trait PrincipalVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal, CoreError>;
}

/// Accepts exactly one pre-shared token.
pub struct SharedSecretVerifier {
    secret: String,
}

impl SharedSecretVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl PrincipalVerifier for SharedSecretVerifier {
    fn verify(&self, token: &str) -> Result<Principal, CoreError> {
        if constant_time_eq(token.as_bytes(), self.secret.as_bytes()) {
            Ok(Principal {
                subject: "shared-secret".into(),
            })
        } else {
            Err(CoreError::Unauthorized("Invalid token".into()))
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verified principal extracted from the `Authorization: Bearer` header.
///
/// ```ignore
/// async fn publish(auth: AuthPrincipal) -> AppResult<Json<()>> {
///     tracing::info!(subject = %auth.0.subject, "publishing");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub Principal);

impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(verifier) = &state.verifier else {
            return Ok(AuthPrincipal(Principal::anonymous()));
        };

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        Ok(AuthPrincipal(verifier.verify(token)?))
    }
}

//! Bearer-token guard for the admin API.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use secrecy::ExposeSecret;

use super::error::AppError;
use super::state::AppState;

/// Proof that the request carried the admin token.
///
/// Mounted on the admin router with `middleware::from_extractor_with_state`,
/// so handlers do not need to take it themselves.
#[derive(Debug, Clone, Copy)]
pub struct AdminGuard;

#[async_trait]
impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let expected = state.config.admin_token.as_ref().ok_or(AppError::AdminDisabled)?;

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format. Expected: Bearer <token>".into()))?;

        if token != expected.expose_secret() {
            tracing::warn!(path = %parts.uri.path(), "rejected admin token");
            return Err(AppError::Unauthorized("Invalid token".into()));
        }
        Ok(AdminGuard)
    }
}

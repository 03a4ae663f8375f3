use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::ai::AiError;
use crate::db::RepositoryError;
use crate::domain::aggregates::{CartError, CouponError, ProductError, RaffleError, SaleError};
use crate::pricing::PricingError;
use crate::services::ServiceError;
use crate::settings::SettingsError;
use crate::storage::StorageError;

/// Error type for HTTP handlers.
///
/// Wraps [`ServiceError`] and adds the variants that only exist at the HTTP
/// edge. Renders as `{"error": message, "code": code}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No admin token is configured.
    #[error("admin API is disabled")]
    AdminDisabled,

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

macro_rules! via_service {
    ($($err:ty),* $(,)?) => {
        $(impl From<$err> for AppError {
            fn from(err: $err) -> Self { AppError::Service(err.into()) }
        })*
    };
}

via_service!(
    RepositoryError, ProductError, CartError, CouponError, SaleError, RaffleError, PricingError, SettingsError, AiError,
    StorageError,
);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Service(err) => classify(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::AdminDisabled => (StatusCode::SERVICE_UNAVAILABLE, "ADMIN_DISABLED", self.to_string()),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal(detail: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %detail, "Internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "An internal error occurred".to_string())
}

fn conflict(msg: String) -> (StatusCode, &'static str, String) {
    (StatusCode::CONFLICT, "CONFLICT", msg)
}

fn invalid(msg: String) -> (StatusCode, &'static str, String) {
    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
}

/// Status, error code and client-facing message for a service error.
fn classify(err: &ServiceError) -> (StatusCode, &'static str, String) {
    match err {
        ServiceError::NotFound { .. } | ServiceError::Repository(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
        }
        ServiceError::Validation(msg) => invalid(msg.clone()),
        ServiceError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg.clone()),
        ServiceError::Repository(e) => internal(e),

        ServiceError::Product(e @ ProductError::InsufficientStock { .. }) => conflict(e.to_string()),
        ServiceError::Cart(e @ (CartError::InsufficientStock { .. } | CartError::Unavailable(_) | CartError::Empty)) => {
            conflict(e.to_string())
        }
        ServiceError::Cart(CartError::ItemNotFound) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        ServiceError::Coupon(CouponError::NotFound) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        ServiceError::Sale(e @ (SaleError::NotPending(_) | SaleError::AlreadyCancelled)) => conflict(e.to_string()),
        ServiceError::Raffle(
            e @ (RaffleError::NotOpen | RaffleError::DuplicateEntry | RaffleError::AlreadyDrawn | RaffleError::NoEntries),
        ) => conflict(e.to_string()),
        ServiceError::Product(_)
        | ServiceError::Category(_)
        | ServiceError::Cart(_)
        | ServiceError::Coupon(_)
        | ServiceError::Sale(_)
        | ServiceError::Customer(_)
        | ServiceError::Employee(_)
        | ServiceError::Raffle(_)
        | ServiceError::Pricing(_) => invalid(err.to_string()),

        ServiceError::Settings(SettingsError::Invalid(msg)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_SETTINGS", msg.clone())
        }
        ServiceError::Settings(SettingsError::Repository(e)) => internal(e),

        ServiceError::Ai(AiError::NotConfigured) => (StatusCode::SERVICE_UNAVAILABLE, "AI_NOT_CONFIGURED", err.to_string()),
        ServiceError::Ai(AiError::InvalidInput(msg)) => invalid(msg.clone()),
        ServiceError::Ai(e) => {
            tracing::error!(error = %e, "AI request failed");
            (StatusCode::BAD_GATEWAY, "AI_ERROR", "The AI service failed to respond".to_string())
        }

        ServiceError::Storage(StorageError::Io(e)) => internal(e),
        ServiceError::Storage(e @ StorageError::TooLarge { .. }) => {
            (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", e.to_string())
        }
        ServiceError::Storage(e) => invalid(e.to_string()),
    }
}

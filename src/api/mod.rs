//! HTTP API.
//!
//! [`router`] builds the full application so the binary and the integration
//! tests run the same stack.

pub mod admin;
pub mod auth;
pub mod error;
pub mod state;
pub mod storefront;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use auth::AdminGuard;
pub use error::{AppError, AppResult};
pub use state::{AppState, Store};

/// Liveness plus a round trip to the document store.
async fn health(State(s): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    if s.docs.is_healthy().await {
        (StatusCode::OK, Json(json!({"status": "healthy", "service": "vitrine"})))
    } else {
        tracing::error!("document store health check failed");
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "unhealthy", "service": "vitrine"})))
    }
}

pub fn router(state: AppState) -> Router {
    let admin = admin::router()
        .route_layer(middleware::from_extractor_with_state::<AdminGuard, AppState>(state.clone()));

    let mut app = Router::new()
        .route("/health", get(health))
        .nest("/api/v1/stores/:store", storefront::router())
        .nest("/api/v1/admin/stores/:store", admin);

    // Media is served from here only when the public URL is a local path.
    let media = &state.config.media;
    if media.public_url.starts_with('/') && media.public_url.len() > 1 {
        app = app.nest_service(&media.public_url, ServeDir::new(&media.root));
    }

    app.layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

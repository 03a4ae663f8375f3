use std::collections::HashMap;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use super::error::{AppError, AppResult};
use crate::ai::{AiError, GenerativeModel};
use crate::config::AppConfig;
use crate::db::{DocumentStore, Tenant};
use crate::domain::value_objects::StoreId;
use crate::realtime::EventBus;
use crate::settings::{SettingsService, SiteInfo};
use crate::storage::ObjectStore;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind an `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub docs: Arc<dyn DocumentStore>,
    pub bus: EventBus,
    pub settings: SettingsService,
    /// `None` when no AI key is configured.
    pub ai: Option<Arc<dyn GenerativeModel>>,
    pub objects: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn tenant(&self, store: &str) -> AppResult<Tenant> {
        let id = StoreId::new(store).map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(Tenant::new(id, self.docs.clone(), self.bus.clone()))
    }

    pub fn model(&self) -> AppResult<&dyn GenerativeModel> {
        self.ai.as_deref().ok_or_else(|| AiError::NotConfigured.into())
    }

    pub async fn site_info(&self, tenant: &Tenant) -> AppResult<Arc<SiteInfo>> {
        Ok(self.settings.get(tenant).await?)
    }
}

/// The tenant named by the `:store` path segment.
pub struct Store(pub Tenant);

#[async_trait]
impl FromRequestParts<AppState> for Store {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let store = params
            .get("store")
            .ok_or_else(|| AppError::BadRequest("missing store in path".into()))?;
        Ok(Store(state.tenant(store)?))
    }
}

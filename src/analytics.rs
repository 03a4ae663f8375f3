//! Storefront analytics events.
//!
//! Events are logged under the `analytics` target and stored per tenant so
//! the admin panel can show a summary.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::db::{RepositoryError, Tenant};
use crate::services::{ServiceError, ServiceResult};

const TOP_PRODUCTS: usize = 10;
/// Largest accepted `metadata`, measured as serialized JSON.
pub const MAX_METADATA_BYTES: usize = 4 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsKind {
    PageView,
    ProductView,
    AddToCart,
    CheckoutStarted,
    WhatsappClick,
    ChatOpened,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: String,
    pub kind: AnalyticsKind,
    pub session_id: Option<String>,
    pub product_id: Option<String>,
    #[serde(default)]
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AnalyticsInput {
    pub kind: AnalyticsKind,
    #[serde(default)]
    #[validate(length(max = 128))]
    pub session_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 128))]
    pub product_id: Option<String>,
    #[serde(default)]
    #[validate(custom = "metadata_size")]
    pub metadata: JsonValue,
}

fn metadata_size(metadata: &JsonValue) -> Result<(), ValidationError> {
    let size = serde_json::to_vec(metadata).map_or(usize::MAX, |b| b.len());
    if size > MAX_METADATA_BYTES {
        let mut err = ValidationError::new("metadata_size");
        err.message = Some(format!("metadata must be at most {MAX_METADATA_BYTES} bytes").into());
        return Err(err);
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductCount {
    pub product_id: String,
    pub views: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub total: u64,
    pub by_kind: BTreeMap<AnalyticsKind, u64>,
    /// Most viewed products, most views first.
    pub top_products: Vec<ProductCount>,
    pub unique_sessions: u64,
}

pub async fn record(tenant: &Tenant, input: AnalyticsInput) -> ServiceResult<AnalyticsEvent> {
    input.validate().map_err(|e| ServiceError::Validation(e.to_string()))?;
    let event = AnalyticsEvent {
        id: Uuid::now_v7().to_string(),
        kind: input.kind,
        session_id: input.session_id.filter(|s| !s.is_empty()),
        product_id: input.product_id.filter(|p| !p.is_empty()),
        metadata: input.metadata,
        created_at: Utc::now(),
    };
    tracing::info!(
        target: "analytics",
        store = %tenant.id(),
        kind = ?event.kind,
        session_id = event.session_id.as_deref(),
        product_id = event.product_id.as_deref(),
        "event"
    );
    tenant.repo::<AnalyticsEvent>().save(&event).await?;
    Ok(event)
}

pub fn summarize(events: &[AnalyticsEvent]) -> AnalyticsSummary {
    let mut summary = AnalyticsSummary::default();
    let mut views: HashMap<&str, u64> = HashMap::new();
    let mut sessions: HashSet<&str> = HashSet::new();
    for event in events {
        summary.total += 1;
        *summary.by_kind.entry(event.kind).or_default() += 1;
        if let Some(session) = event.session_id.as_deref() {
            sessions.insert(session);
        }
        if let (AnalyticsKind::ProductView, Some(product)) = (event.kind, event.product_id.as_deref()) {
            *views.entry(product).or_default() += 1;
        }
    }
    let mut top: Vec<ProductCount> =
        views.into_iter().map(|(id, views)| ProductCount { product_id: id.to_string(), views }).collect();
    top.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.product_id.cmp(&b.product_id)));
    top.truncate(TOP_PRODUCTS);
    summary.top_products = top;
    summary.unique_sessions = sessions.len() as u64;
    summary
}

/// Summary of the last `days` days, or of everything when `None`.
pub async fn summary(tenant: &Tenant, days: Option<u32>) -> Result<AnalyticsSummary, RepositoryError> {
    let since = days.map(|d| Utc::now() - Duration::days(i64::from(d)));
    let events: Vec<AnalyticsEvent> = tenant
        .repo::<AnalyticsEvent>()
        .list()
        .await?
        .into_iter()
        .filter(|e| since.map_or(true, |since| e.created_at >= since))
        .collect();
    Ok(summarize(&events))
}

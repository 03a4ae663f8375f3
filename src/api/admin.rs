//! Admin routes, under `/api/v1/admin/stores/:store`. Every route requires
//! the admin bearer token.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast::error::RecvError;

use super::error::{AppError, AppResult};
use super::state::{AppState, Store};
use super::storefront::IdPath;
use crate::ai::tasks::{self, ImageData, ProductDraft};
use crate::analytics::{self, AnalyticsSummary};
use crate::db::Tenant;
use crate::domain::aggregates::{
    Category, CategoryInput, Coupon, CouponInput, Customer, CustomerInput, Employee, EmployeeInput, Product, ProductInput,
    Raffle, RaffleEntry, RaffleInput, Sale,
};
use crate::domain::value_objects::Money;
use crate::pricing::MarginBreakdown;
use crate::services::catalog::{self, ProductFilter};
use crate::services::sales::{self, HistoryQuery, PdvSaleRequest, SalesSummary};
use crate::services::{coupons, customers, employees, raffles, ServiceError};
use crate::settings::SiteInfo;
use crate::storage::{
    object_key, prepare_for_upload, validate_key, PreparedImage, ProgressCallback, StoredObject, DEFAULT_MAX_DIMENSION,
    MAX_UPLOAD_BYTES,
};

/// Room for the multipart framing around the largest accepted image.
const BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/products/:id/stock", post(adjust_stock))
        .route("/products/:id/publish", post(publish_product))
        .route("/products/:id/archive", post(archive_product))
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:id", put(update_category).delete(delete_category))
        .route("/settings", get(get_settings).patch(update_settings).delete(reset_settings))
        .route("/pdv/sales", post(create_pdv_sale))
        .route("/sales", get(sales_history))
        .route("/sales/summary", get(sales_summary))
        .route("/sales/:id", get(get_sale))
        .route("/sales/:id/complete", post(complete_sale))
        .route("/sales/:id/cancel", post(cancel_sale))
        .route("/customers", get(list_customers).post(create_customer))
        .route("/customers/:id", get(get_customer).put(update_customer).delete(delete_customer))
        .route("/coupons", get(list_coupons).post(upsert_coupon))
        .route("/coupons/:id", get(get_coupon).delete(delete_coupon))
        .route("/raffles", get(list_raffles).post(create_raffle))
        .route("/raffles/:id", get(get_raffle).delete(delete_raffle))
        .route("/raffles/:id/close", post(close_raffle))
        .route("/raffles/:id/draw", post(draw_raffle))
        .route("/employees", get(list_employees).post(create_employee))
        .route("/employees/:id", get(get_employee).put(update_employee).delete(delete_employee))
        .route("/uploads", post(upload))
        .route("/uploads/*key", delete(delete_upload))
        .route("/ai/extract-product", post(extract_product))
        .route("/ai/edit-image", post(edit_image))
        .route("/ai/margin", post(margin))
        .route("/analytics/summary", get(analytics_summary))
        .route("/events", get(events))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

// --- catalog ---

#[derive(Debug, Deserialize)] pub struct StockRequest { pub delta: i64 }

async fn list_products(Store(t): Store, Query(f): Query<ProductFilter>) -> AppResult<Json<Vec<Product>>> { Ok(Json(catalog::list_all(&t, &f).await?)) }
async fn get_product(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<Product>> { Ok(Json(catalog::get(&t, &p.id).await?)) }
async fn create_product(Store(t): Store, Json(r): Json<ProductInput>) -> AppResult<(StatusCode, Json<Product>)> { Ok((StatusCode::CREATED, Json(catalog::create(&t, &r).await?))) }
async fn update_product(Store(t): Store, Path(p): Path<IdPath>, Json(r): Json<ProductInput>) -> AppResult<Json<Product>> { Ok(Json(catalog::update(&t, &p.id, &r).await?)) }
async fn delete_product(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<StatusCode> { catalog::delete(&t, &p.id).await?; Ok(StatusCode::NO_CONTENT) }
async fn adjust_stock(Store(t): Store, Path(p): Path<IdPath>, Json(r): Json<StockRequest>) -> AppResult<Json<Product>> { Ok(Json(catalog::adjust_stock(&t, &p.id, r.delta).await?)) }
async fn publish_product(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<Product>> { Ok(Json(catalog::publish(&t, &p.id).await?)) }
async fn archive_product(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<Product>> { Ok(Json(catalog::archive(&t, &p.id).await?)) }

async fn list_categories(Store(t): Store) -> AppResult<Json<Vec<Category>>> { Ok(Json(catalog::list_categories(&t).await?)) }
async fn create_category(Store(t): Store, Json(r): Json<CategoryInput>) -> AppResult<(StatusCode, Json<Category>)> { Ok((StatusCode::CREATED, Json(catalog::create_category(&t, &r).await?))) }
async fn update_category(Store(t): Store, Path(p): Path<IdPath>, Json(r): Json<CategoryInput>) -> AppResult<Json<Category>> { Ok(Json(catalog::update_category(&t, &p.id, &r).await?)) }
async fn delete_category(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<StatusCode> { catalog::delete_category(&t, &p.id).await?; Ok(StatusCode::NO_CONTENT) }

// --- settings ---

async fn get_settings(State(s): State<AppState>, Store(t): Store) -> AppResult<Json<SiteInfo>> {
    Ok(Json(s.site_info(&t).await?.as_ref().clone()))
}

async fn update_settings(State(s): State<AppState>, Store(t): Store, Json(patch): Json<JsonValue>) -> AppResult<Json<SiteInfo>> {
    Ok(Json(s.settings.update(&t, patch).await?.as_ref().clone()))
}

async fn reset_settings(State(s): State<AppState>, Store(t): Store) -> AppResult<StatusCode> {
    s.settings.reset(&t).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- sales ---

async fn create_pdv_sale(State(s): State<AppState>, Store(t): Store, Json(r): Json<PdvSaleRequest>) -> AppResult<(StatusCode, Json<Sale>)> {
    let info = s.site_info(&t).await?;
    Ok((StatusCode::CREATED, Json(sales::create_pdv_sale(&t, &info, r).await?)))
}

async fn sales_history(Store(t): Store, Query(q): Query<HistoryQuery>) -> AppResult<Json<Vec<Sale>>> { Ok(Json(sales::history(&t, &q).await?)) }
async fn sales_summary(Store(t): Store, Query(q): Query<HistoryQuery>) -> AppResult<Json<SalesSummary>> { Ok(Json(sales::summary(&t, &q).await?)) }
async fn get_sale(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<Sale>> { Ok(Json(sales::get(&t, &p.id).await?)) }
async fn complete_sale(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<Sale>> { Ok(Json(sales::complete(&t, &p.id).await?)) }
async fn cancel_sale(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<Sale>> { Ok(Json(sales::cancel(&t, &p.id).await?)) }

// --- customers, coupons, raffles, employees ---

#[derive(Debug, Deserialize)] pub struct SearchQuery { pub search: Option<String> }

async fn list_customers(Store(t): Store, Query(q): Query<SearchQuery>) -> AppResult<Json<Vec<Customer>>> { Ok(Json(customers::list(&t, q.search.as_deref()).await?)) }
async fn get_customer(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<Customer>> { Ok(Json(customers::get(&t, &p.id).await?)) }
async fn create_customer(Store(t): Store, Json(r): Json<CustomerInput>) -> AppResult<(StatusCode, Json<Customer>)> { Ok((StatusCode::CREATED, Json(customers::create(&t, &r).await?))) }
async fn update_customer(Store(t): Store, Path(p): Path<IdPath>, Json(r): Json<CustomerInput>) -> AppResult<Json<Customer>> { Ok(Json(customers::update(&t, &p.id, &r).await?)) }
async fn delete_customer(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<StatusCode> { customers::delete(&t, &p.id).await?; Ok(StatusCode::NO_CONTENT) }

async fn list_coupons(Store(t): Store) -> AppResult<Json<Vec<Coupon>>> { Ok(Json(coupons::list(&t).await?)) }
async fn get_coupon(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<Coupon>> { Ok(Json(coupons::get(&t, &p.id).await?)) }
async fn upsert_coupon(Store(t): Store, Json(r): Json<CouponInput>) -> AppResult<Json<Coupon>> { Ok(Json(coupons::upsert(&t, r).await?)) }
async fn delete_coupon(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<StatusCode> { coupons::delete(&t, &p.id).await?; Ok(StatusCode::NO_CONTENT) }

async fn list_raffles(Store(t): Store) -> AppResult<Json<Vec<Raffle>>> { Ok(Json(raffles::list(&t).await?)) }
async fn get_raffle(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<Raffle>> { Ok(Json(raffles::get(&t, &p.id).await?)) }
async fn create_raffle(Store(t): Store, Json(r): Json<RaffleInput>) -> AppResult<(StatusCode, Json<Raffle>)> { Ok((StatusCode::CREATED, Json(raffles::create(&t, &r).await?))) }
async fn delete_raffle(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<StatusCode> { raffles::delete(&t, &p.id).await?; Ok(StatusCode::NO_CONTENT) }
async fn close_raffle(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<Raffle>> { Ok(Json(raffles::close(&t, &p.id).await?)) }
async fn draw_raffle(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<RaffleEntry>> { Ok(Json(raffles::draw(&t, &p.id).await?)) }

async fn list_employees(Store(t): Store) -> AppResult<Json<Vec<Employee>>> { Ok(Json(employees::list(&t).await?)) }
async fn get_employee(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<Employee>> { Ok(Json(employees::get(&t, &p.id).await?)) }
async fn create_employee(Store(t): Store, Json(r): Json<EmployeeInput>) -> AppResult<(StatusCode, Json<Employee>)> { Ok((StatusCode::CREATED, Json(employees::create(&t, &r).await?))) }
async fn update_employee(Store(t): Store, Path(p): Path<IdPath>, Json(r): Json<EmployeeInput>) -> AppResult<Json<Employee>> { Ok(Json(employees::update(&t, &p.id, &r).await?)) }
async fn delete_employee(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<StatusCode> { employees::delete(&t, &p.id).await?; Ok(StatusCode::NO_CONTENT) }

// --- uploads ---

/// Text fields and files of a multipart form.
#[derive(Default)]
struct Form {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

impl Form {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Form::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            if field.file_name().is_some() {
                let data = field.bytes().await.map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.files.insert(name, data.to_vec());
            } else {
                let text = field.text().await.map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub object: StoredObject,
    pub width: u32,
    pub height: u32,
}

/// Decodes and downscales off the async runtime.
async fn prepare(bytes: Vec<u8>) -> AppResult<PreparedImage> {
    let prepared = tokio::task::spawn_blocking(move || prepare_for_upload(&bytes, DEFAULT_MAX_DIMENSION))
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))??;
    Ok(prepared)
}

async fn store_image(s: &AppState, t: &Tenant, folder: &str, image: &PreparedImage) -> AppResult<UploadResponse> {
    let key = object_key(t.id(), folder, image.extension);
    let report: ProgressCallback<'_> =
        &|p| tracing::debug!(key = %key, percent = p.percent(), "upload progress");
    let object = s.objects.put(&key, &image.bytes, image.mime_type, Some(report)).await?;
    tracing::info!(store = %t.id(), key = %object.key, size = object.size, "image stored");
    Ok(UploadResponse { object, width: image.width, height: image.height })
}

fn folder_name(form: &Form) -> AppResult<&str> {
    let folder = form.text("folder").unwrap_or("products");
    let valid = folder.len() <= 32 && folder.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid { Ok(folder) } else { Err(AppError::BadRequest(format!("invalid folder: {folder}"))) }
}

async fn upload(State(s): State<AppState>, Store(t): Store, multipart: Multipart) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let mut form = Form::read(multipart).await?;
    let folder = folder_name(&form)?.to_string();
    let bytes = form.files.remove("file").ok_or_else(|| AppError::BadRequest("missing file field".into()))?;
    let image = prepare(bytes).await?;
    Ok((StatusCode::CREATED, Json(store_image(&s, &t, &folder, &image).await?)))
}

#[derive(Debug, Deserialize)] pub struct KeyPath { pub key: String }

async fn delete_upload(State(s): State<AppState>, Store(t): Store, Path(p): Path<KeyPath>) -> AppResult<StatusCode> {
    validate_key(t.id(), &p.key)?;
    if !s.objects.delete(&p.key).await? {
        return Err(ServiceError::NotFound { entity: "object", id: p.key }.into());
    }
    tracing::info!(store = %t.id(), key = %p.key, "object deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- AI ---

async fn image_field(form: &mut Form, name: &str) -> AppResult<Option<ImageData>> {
    match form.files.remove(name) {
        Some(bytes) => {
            let prepared = prepare(bytes).await?;
            Ok(Some(ImageData { mime_type: prepared.mime_type.to_string(), bytes: prepared.bytes }))
        }
        None => Ok(None),
    }
}

async fn extract_product(State(s): State<AppState>, multipart: Multipart) -> AppResult<Json<ProductDraft>> {
    let model = s.model()?;
    let mut form = Form::read(multipart).await?;
    let image = image_field(&mut form, "image").await?;
    Ok(Json(tasks::extract_product(model, form.text("text"), image.as_ref()).await?))
}

async fn edit_image(State(s): State<AppState>, Store(t): Store, multipart: Multipart) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let model = s.model()?;
    let mut form = Form::read(multipart).await?;
    let image = image_field(&mut form, "image")
        .await?
        .ok_or_else(|| AppError::BadRequest("missing image field".into()))?;
    let edited = tasks::edit_image(model, &image, form.text("instruction")).await?;
    let prepared = prepare(edited.bytes).await?;
    Ok((StatusCode::CREATED, Json(store_image(&s, &t, "products", &prepared).await?)))
}

fn one() -> u32 { 1 }

#[derive(Debug, Deserialize)]
pub struct MarginRequest {
    pub price: Money,
    #[serde(default)]
    pub cost: Money,
    #[serde(default = "one")]
    pub installments: u32,
    #[serde(default)]
    pub product_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarginResponse {
    #[serde(flatten)]
    pub breakdown: MarginBreakdown,
    /// Absent when AI is not configured or the model call failed.
    pub commentary: Option<String>,
}

async fn margin(State(s): State<AppState>, Store(t): Store, Json(r): Json<MarginRequest>) -> AppResult<Json<MarginResponse>> {
    let info = s.site_info(&t).await?;
    let breakdown = info.installments.margin_breakdown(r.price, r.cost, r.installments)?;
    let commentary = match s.ai.as_deref() {
        Some(model) => match tasks::margin_commentary(model, r.product_name.as_deref(), &breakdown).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(store = %t.id(), error = %e, "margin commentary failed");
                None
            }
        },
        None => None,
    };
    Ok(Json(MarginResponse { breakdown, commentary }))
}

// --- analytics and events ---

#[derive(Debug, Deserialize)] pub struct DaysQuery { pub days: Option<u32> }

async fn analytics_summary(Store(t): Store, Query(q): Query<DaysQuery>) -> AppResult<Json<AnalyticsSummary>> {
    Ok(Json(analytics::summary(&t, q.days).await?))
}

/// Server-sent stream of this store's change and domain events.
async fn events(State(s): State<AppState>, Store(t): Store) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = s.bus.subscribe();
    let store = t.id().clone();
    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) if event.store_id == store => {
                    match Event::default().event(event.subject()).json_data(&event) {
                        Ok(sse) => yield Ok::<_, Infallible>(sse),
                        Err(e) => tracing::warn!(store = %store, error = %e, "could not encode event"),
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => tracing::warn!(store = %store, skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

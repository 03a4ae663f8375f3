//! Public storefront routes, under `/api/v1/stores/:store`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::error::AppResult;
use super::state::{AppState, Store};
use crate::analytics::{self, AnalyticsEvent, AnalyticsInput};
use crate::chat::{self, Greeting};
use crate::domain::aggregates::{Category, ChatMessage, Product, RaffleSummary};
use crate::domain::value_objects::Money;
use crate::pricing::InstallmentQuote;
use crate::services::cart::{self, CartView};
use crate::services::catalog::{self, ProductFilter};
use crate::services::checkout::{self, CheckoutRequest, CheckoutResult};
use crate::services::raffles;
use crate::settings::SiteInfo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings", get(site_info))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/categories", get(list_categories))
        .route("/cart/:session", get(get_cart).delete(clear_cart))
        .route("/cart/:session/items", post(add_item).patch(set_quantity).delete(remove_item))
        .route("/cart/:session/coupon", post(apply_coupon).delete(remove_coupon))
        .route("/installments/simulate", post(simulate))
        .route("/checkout", post(place_order))
        .route("/chat/greeting", get(greeting))
        .route("/chat/:session/messages", get(chat_history).post(send_message))
        .route("/raffles", get(list_raffles))
        .route("/raffles/:id/entries", post(enter_raffle))
        .route("/analytics", post(track))
}

#[derive(Debug, Deserialize)] pub struct IdPath { pub id: String }
#[derive(Debug, Deserialize)] pub struct SessionPath { pub session: String }

async fn site_info(State(s): State<AppState>, Store(t): Store) -> AppResult<Json<SiteInfo>> {
    Ok(Json(s.site_info(&t).await?.as_ref().clone()))
}

async fn list_products(Store(t): Store, Query(f): Query<ProductFilter>) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(catalog::list_public(&t, &f).await?))
}

async fn get_product(Store(t): Store, Path(p): Path<IdPath>) -> AppResult<Json<Product>> {
    Ok(Json(catalog::get_public(&t, &p.id).await?))
}

async fn list_categories(Store(t): Store) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(catalog::list_categories(&t).await?))
}

// --- cart ---

fn one() -> u32 { 1 }

#[derive(Debug, Deserialize)]
pub struct CartItemRequest {
    pub product_id: String,
    #[serde(default)]
    pub option: Option<String>,
    #[serde(default = "one")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ItemKey {
    pub product_id: String,
    pub option: Option<String>,
}

#[derive(Debug, Deserialize)] pub struct CouponRequest { pub code: String }

async fn get_cart(Store(t): Store, Path(p): Path<SessionPath>) -> AppResult<Json<CartView>> {
    Ok(Json(cart::get(&t, &p.session).await?))
}

async fn clear_cart(Store(t): Store, Path(p): Path<SessionPath>) -> AppResult<StatusCode> {
    cart::clear(&t, &p.session).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_item(Store(t): Store, Path(p): Path<SessionPath>, Json(r): Json<CartItemRequest>) -> AppResult<Json<CartView>> {
    Ok(Json(cart::add(&t, &p.session, &r.product_id, r.option, r.quantity).await?))
}

async fn set_quantity(Store(t): Store, Path(p): Path<SessionPath>, Json(r): Json<CartItemRequest>) -> AppResult<Json<CartView>> {
    Ok(Json(cart::update_quantity(&t, &p.session, &r.product_id, r.option.as_deref(), r.quantity).await?))
}

async fn remove_item(Store(t): Store, Path(p): Path<SessionPath>, Query(k): Query<ItemKey>) -> AppResult<Json<CartView>> {
    Ok(Json(cart::remove(&t, &p.session, &k.product_id, k.option.as_deref()).await?))
}

async fn apply_coupon(Store(t): Store, Path(p): Path<SessionPath>, Json(r): Json<CouponRequest>) -> AppResult<Json<CartView>> {
    Ok(Json(cart::apply_coupon(&t, &p.session, &r.code).await?))
}

async fn remove_coupon(Store(t): Store, Path(p): Path<SessionPath>) -> AppResult<Json<CartView>> {
    Ok(Json(cart::remove_coupon(&t, &p.session).await?))
}

// --- pricing and checkout ---

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub price: Money,
    #[serde(default)]
    pub down_payment: Option<Money>,
    /// Only this option; every offered option when absent.
    #[serde(default)]
    pub installments: Option<u32>,
}

async fn simulate(State(s): State<AppState>, Store(t): Store, Json(r): Json<SimulateRequest>) -> AppResult<Json<Vec<InstallmentQuote>>> {
    let info = s.site_info(&t).await?;
    let down = r.down_payment.unwrap_or(Money::ZERO);
    let quotes = match r.installments {
        Some(n) => vec![info.installments.simulate(r.price, down, n)?],
        None => info.installments.simulate_all(r.price, down)?,
    };
    Ok(Json(quotes))
}

async fn place_order(State(s): State<AppState>, Store(t): Store, Json(r): Json<CheckoutRequest>) -> AppResult<(StatusCode, Json<CheckoutResult>)> {
    let info = s.site_info(&t).await?;
    Ok((StatusCode::CREATED, Json(checkout::checkout(&t, &info, r).await?)))
}

// --- chat ---

#[derive(Debug, Deserialize)] pub struct ChatRequest { pub text: String }

async fn greeting(State(s): State<AppState>, Store(t): Store) -> AppResult<Json<Greeting>> {
    let info = s.site_info(&t).await?;
    Ok(Json(chat::greeting(&info, s.ai.as_deref()).await))
}

async fn chat_history(Store(t): Store, Path(p): Path<SessionPath>) -> AppResult<Json<Vec<ChatMessage>>> {
    Ok(Json(chat::history(&t, &p.session).await?))
}

async fn send_message(State(s): State<AppState>, Store(t): Store, Path(p): Path<SessionPath>, Json(r): Json<ChatRequest>) -> AppResult<Json<ChatMessage>> {
    let info = s.site_info(&t).await?;
    let model = s.model()?;
    Ok(Json(chat::reply(&t, &info, model, &p.session, &r.text, s.config.chat_history_limit).await?))
}

// --- raffles and analytics ---

#[derive(Debug, Deserialize)] pub struct EntryRequest { pub name: String, pub phone: String }

async fn list_raffles(Store(t): Store) -> AppResult<Json<Vec<RaffleSummary>>> {
    Ok(Json(raffles::list_public(&t).await?))
}

async fn enter_raffle(Store(t): Store, Path(p): Path<IdPath>, Json(r): Json<EntryRequest>) -> AppResult<(StatusCode, Json<RaffleSummary>)> {
    Ok((StatusCode::CREATED, Json(raffles::enter(&t, &p.id, &r.name, &r.phone).await?)))
}

async fn track(Store(t): Store, Json(r): Json<AnalyticsInput>) -> AppResult<(StatusCode, Json<AnalyticsEvent>)> {
    Ok((StatusCode::CREATED, Json(analytics::record(&t, r).await?)))
}

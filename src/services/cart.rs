//! Storefront session carts.

use chrono::Utc;
use serde::Serialize;

use super::{catalog, ServiceError, ServiceResult};
use crate::db::Tenant;
use crate::domain::aggregates::coupon::normalize_code;
use crate::domain::aggregates::{Cart, CartItem, Coupon, CouponError};
use crate::domain::value_objects::Money;

/// Cart with its current totals.
#[derive(Clone, Debug, Serialize)]
pub struct CartView {
    pub session_id: String,
    pub items: Vec<CartItem>,
    pub item_count: u32,
    pub subtotal: Money,
    pub coupon_code: Option<String>,
    pub discount: Money,
    pub total: Money,
    /// Why the attached coupon no longer applies, if it doesn't.
    pub coupon_error: Option<String>,
}

pub(crate) fn check_session(session_id: &str) -> ServiceResult<()> {
    let len = session_id.chars().count();
    if len == 0 || len > 100 {
        return Err(ServiceError::Validation("session id must have 1 to 100 characters".into()));
    }
    Ok(())
}

/// The session's cart, or a fresh empty one.
pub(crate) async fn load(tenant: &Tenant, session_id: &str) -> ServiceResult<Cart> {
    check_session(session_id)?;
    Ok(tenant.repo::<Cart>().get(session_id).await?.unwrap_or_else(|| Cart::new(session_id)))
}

/// Discount of the cart's coupon against its current subtotal.
pub(crate) async fn coupon_discount(tenant: &Tenant, cart: &Cart) -> ServiceResult<Result<(Coupon, Money), CouponError>> {
    let Some(code) = cart.coupon_code() else {
        return Ok(Err(CouponError::NotFound));
    };
    let Some(coupon) = tenant.repo::<Coupon>().get(code).await? else {
        return Ok(Err(CouponError::NotFound));
    };
    Ok(coupon.discount_for(cart.subtotal(), Utc::now()).map(|discount| (coupon, discount)))
}

async fn view(tenant: &Tenant, cart: &Cart) -> ServiceResult<CartView> {
    let subtotal = cart.subtotal();
    let (discount, coupon_error) = match cart.coupon_code() {
        None => (Money::ZERO, None),
        Some(_) => match coupon_discount(tenant, cart).await? {
            Ok((_, discount)) => (discount, None),
            Err(e) => (Money::ZERO, Some(e.to_string())),
        },
    };
    Ok(CartView {
        session_id: cart.session_id().to_string(),
        items: cart.items().to_vec(),
        item_count: cart.item_count(),
        subtotal,
        coupon_code: cart.coupon_code().map(str::to_string),
        discount,
        total: subtotal.saturating_sub(discount),
        coupon_error,
    })
}

async fn save(tenant: &Tenant, cart: &Cart) -> ServiceResult<CartView> {
    tenant.repo::<Cart>().save(cart).await?;
    view(tenant, cart).await
}

pub async fn get(tenant: &Tenant, session_id: &str) -> ServiceResult<CartView> {
    let cart = load(tenant, session_id).await?;
    view(tenant, &cart).await
}

pub async fn add(tenant: &Tenant, session_id: &str, product_id: &str, option: Option<String>, quantity: u32) -> ServiceResult<CartView> {
    let mut cart = load(tenant, session_id).await?;
    let product = catalog::get_public(tenant, product_id).await?;
    cart.add_item(&product, option, quantity)?;
    save(tenant, &cart).await
}

pub async fn update_quantity(tenant: &Tenant, session_id: &str, product_id: &str, option: Option<&str>, quantity: u32) -> ServiceResult<CartView> {
    let mut cart = load(tenant, session_id).await?;
    let product = catalog::get(tenant, product_id).await?;
    cart.update_quantity(&product, option, quantity)?;
    save(tenant, &cart).await
}

pub async fn remove(tenant: &Tenant, session_id: &str, product_id: &str, option: Option<&str>) -> ServiceResult<CartView> {
    let mut cart = load(tenant, session_id).await?;
    cart.remove_item(product_id, option)?;
    save(tenant, &cart).await
}

pub async fn clear(tenant: &Tenant, session_id: &str) -> ServiceResult<()> {
    check_session(session_id)?;
    tenant.repo::<Cart>().delete(session_id).await?;
    Ok(())
}

/// Attaches a coupon after checking it applies to the current subtotal.
pub async fn apply_coupon(tenant: &Tenant, session_id: &str, code: &str) -> ServiceResult<CartView> {
    let mut cart = load(tenant, session_id).await?;
    let code = normalize_code(code);
    let coupon = tenant.repo::<Coupon>().get(&code).await?.ok_or(CouponError::NotFound)?;
    coupon.discount_for(cart.subtotal(), Utc::now())?;
    cart.set_coupon(Some(code));
    save(tenant, &cart).await
}

pub async fn remove_coupon(tenant: &Tenant, session_id: &str) -> ServiceResult<CartView> {
    let mut cart = load(tenant, session_id).await?;
    cart.set_coupon(None);
    save(tenant, &cart).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use crate::domain::aggregates::{CouponInput, Discount, ProductInput, ProductStatus};
    use crate::domain::value_objects::StoreId;
    use crate::realtime::EventBus;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn tenant() -> Tenant {
        Tenant::new(StoreId::new("loja").unwrap(), Arc::new(MemoryDocumentStore::default()), EventBus::new(None))
    }

    async fn product(t: &Tenant, cents: i64, stock: i64) -> String {
        let input = ProductInput { name: "Camisa".into(), price: Decimal::new(cents, 2), stock, status: Some(ProductStatus::Active), ..Default::default() };
        catalog::create(t, &input).await.unwrap().id().to_string()
    }

    async fn coupon(t: &Tenant, min_cents: Option<i64>) {
        let coupon = Coupon::create(CouponInput {
            code: "promo10".into(), discount: Discount::Percentage(Decimal::TEN),
            min_purchase: min_cents.map(Money::from_cents), expires_at: None, usage_limit: None, active: true,
        }).unwrap();
        t.repo::<Coupon>().save(&coupon).await.unwrap();
    }

    #[tokio::test]
    async fn test_totals_with_coupon() {
        let t = tenant();
        let id = product(&t, 5000, 10).await;
        coupon(&t, None).await;
        add(&t, "s1", &id, None, 2).await.unwrap();
        let view = apply_coupon(&t, "s1", " Promo10 ").await.unwrap();
        assert_eq!(view.subtotal, Money::from_cents(10_000));
        assert_eq!(view.discount, Money::from_cents(1000));
        assert_eq!(view.total, Money::from_cents(9000));
        assert_eq!(view.coupon_code.as_deref(), Some("PROMO10"));
    }

    #[tokio::test]
    async fn test_coupon_that_stops_applying_is_reported() {
        let t = tenant();
        let id = product(&t, 5000, 10).await;
        coupon(&t, Some(8000)).await;
        add(&t, "s1", &id, None, 2).await.unwrap();
        apply_coupon(&t, "s1", "PROMO10").await.unwrap();
        let view = update_quantity(&t, "s1", &id, None, 1).await.unwrap();
        assert_eq!(view.discount, Money::ZERO);
        assert!(view.coupon_error.is_some());
    }

    #[tokio::test]
    async fn test_unknown_coupon_rejected() {
        let t = tenant();
        assert!(matches!(apply_coupon(&t, "s1", "NADA").await, Err(ServiceError::Coupon(CouponError::NotFound))));
    }

    #[tokio::test]
    async fn test_stock_limit_and_clear() {
        let t = tenant();
        let id = product(&t, 1000, 1).await;
        add(&t, "s1", &id, None, 1).await.unwrap();
        assert!(matches!(add(&t, "s1", &id, None, 1).await, Err(ServiceError::Cart(_))));
        clear(&t, "s1").await.unwrap();
        assert_eq!(get(&t, "s1").await.unwrap().item_count, 0);
    }

    #[tokio::test]
    async fn test_session_id_length() {
        let t = tenant();
        assert!(matches!(get(&t, "").await, Err(ServiceError::Validation(_))));
        assert!(matches!(get(&t, &"x".repeat(101)).await, Err(ServiceError::Validation(_))));
    }
}

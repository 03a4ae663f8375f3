//! Coupon administration.

use super::{not_found, ServiceResult};
use crate::db::Tenant;
use crate::domain::aggregates::coupon::normalize_code;
use crate::domain::aggregates::{Coupon, CouponInput};

pub async fn list(tenant: &Tenant) -> ServiceResult<Vec<Coupon>> {
    let mut coupons = tenant.repo::<Coupon>().list().await?;
    coupons.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(coupons)
}

pub async fn get(tenant: &Tenant, code: &str) -> ServiceResult<Coupon> {
    let code = normalize_code(code);
    tenant.repo::<Coupon>().get(&code).await?.ok_or_else(|| not_found("coupon", &code))
}

/// Creates or replaces the coupon with this code; the usage count survives a replace.
pub async fn upsert(tenant: &Tenant, input: CouponInput) -> ServiceResult<Coupon> {
    let repo = tenant.repo::<Coupon>();
    let mut coupon = Coupon::create(input)?;
    if let Some(existing) = repo.get(&coupon.code).await? {
        coupon.used_count = existing.used_count;
        coupon.created_at = existing.created_at;
    }
    repo.save(&coupon).await?;
    Ok(coupon)
}

pub async fn delete(tenant: &Tenant, code: &str) -> ServiceResult<()> {
    let code = normalize_code(code);
    if !tenant.repo::<Coupon>().delete(&code).await? {
        return Err(not_found("coupon", &code));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use crate::domain::aggregates::Discount;
    use crate::domain::value_objects::{Money, StoreId};
    use crate::realtime::EventBus;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_upsert_keeps_usage() {
        let t = Tenant::new(StoreId::new("loja").unwrap(), Arc::new(MemoryDocumentStore::default()), EventBus::new(None));
        let input = || CouponInput {
            code: "frete".into(), discount: Discount::Fixed(Money::from_cents(1500)),
            min_purchase: None, expires_at: None, usage_limit: Some(10), active: true,
        };
        let mut coupon = upsert(&t, input()).await.unwrap();
        coupon.redeem();
        t.repo::<Coupon>().save(&coupon).await.unwrap();

        let replaced = upsert(&t, CouponInput { usage_limit: Some(20), ..input() }).await.unwrap();
        assert_eq!(replaced.used_count, 1);
        assert_eq!(get(&t, "FRETE").await.unwrap().usage_limit, Some(20));
        delete(&t, "frete").await.unwrap();
        assert!(list(&t).await.unwrap().is_empty());
    }
}

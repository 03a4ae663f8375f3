//! Products and categories.

use serde::Deserialize;

use super::{not_found, ServiceResult};
use crate::db::Tenant;
use crate::domain::aggregates::category::sort_categories;
use crate::domain::aggregates::{Category, CategoryInput, Product, ProductInput};

/// Storefront/admin listing filters.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    #[serde(alias = "q")]
    pub search: Option<String>,
    pub featured: Option<bool>,
}

impl ProductFilter {
    fn accepts(&self, product: &Product) -> bool {
        self.category.as_deref().map_or(true, |c| product.category_id() == Some(c))
            && self.search.as_deref().map_or(true, |q| product.matches(q))
            && self.featured.map_or(true, |f| product.is_featured() == f)
    }
}

/// Active products only; newest first.
pub async fn list_public(tenant: &Tenant, filter: &ProductFilter) -> ServiceResult<Vec<Product>> {
    let mut products: Vec<Product> = list_all(tenant, filter).await?.into_iter().filter(Product::is_active).collect();
    products.sort_by_key(|p| std::cmp::Reverse(p.created_at()));
    Ok(products)
}

/// Every product regardless of status, for the admin panel.
pub async fn list_all(tenant: &Tenant, filter: &ProductFilter) -> ServiceResult<Vec<Product>> {
    let products = tenant.repo::<Product>().list().await?;
    Ok(products.into_iter().filter(|p| filter.accepts(p)).collect())
}

pub async fn get(tenant: &Tenant, id: &str) -> ServiceResult<Product> {
    tenant.repo::<Product>().get(id).await?.ok_or_else(|| not_found("product", id))
}

/// A product the storefront may show.
pub async fn get_public(tenant: &Tenant, id: &str) -> ServiceResult<Product> {
    let product = get(tenant, id).await?;
    if !product.is_active() {
        return Err(not_found("product", id));
    }
    Ok(product)
}

pub async fn create(tenant: &Tenant, input: &ProductInput) -> ServiceResult<Product> {
    ensure_category(tenant, input.category_id.as_deref()).await?;
    let mut product = Product::create(input)?;
    tenant.repo::<Product>().save(&product).await?;
    tenant.publish(product.take_events()).await;
    tracing::info!(store = %tenant.id(), product_id = %product.id(), "product created");
    Ok(product)
}

pub async fn update(tenant: &Tenant, id: &str, input: &ProductInput) -> ServiceResult<Product> {
    ensure_category(tenant, input.category_id.as_deref()).await?;
    let mut product = get(tenant, id).await?;
    product.update(input)?;
    tenant.repo::<Product>().save(&product).await?;
    tenant.publish(product.take_events()).await;
    Ok(product)
}

pub async fn delete(tenant: &Tenant, id: &str) -> ServiceResult<()> {
    if !tenant.repo::<Product>().delete(id).await? {
        return Err(not_found("product", id));
    }
    tracing::info!(store = %tenant.id(), product_id = %id, "product deleted");
    Ok(())
}

/// Adds (positive) or removes (negative) stock; stock never goes below zero.
pub async fn adjust_stock(tenant: &Tenant, id: &str, delta: i64) -> ServiceResult<Product> {
    let mut product = get(tenant, id).await?;
    product.adjust_stock(delta)?;
    tenant.repo::<Product>().save(&product).await?;
    tenant.publish(product.take_events()).await;
    tracing::info!(store = %tenant.id(), product_id = %id, delta, stock = product.stock().value(), "stock adjusted");
    Ok(product)
}

pub async fn publish(tenant: &Tenant, id: &str) -> ServiceResult<Product> {
    let mut product = get(tenant, id).await?;
    product.publish()?;
    tenant.repo::<Product>().save(&product).await?;
    tenant.publish(product.take_events()).await;
    Ok(product)
}

pub async fn archive(tenant: &Tenant, id: &str) -> ServiceResult<Product> {
    let mut product = get(tenant, id).await?;
    product.archive();
    tenant.repo::<Product>().save(&product).await?;
    Ok(product)
}

async fn ensure_category(tenant: &Tenant, category_id: Option<&str>) -> ServiceResult<()> {
    match category_id {
        Some(id) if tenant.repo::<Category>().get(id).await?.is_none() => Err(not_found("category", id)),
        _ => Ok(()),
    }
}

pub async fn list_categories(tenant: &Tenant) -> ServiceResult<Vec<Category>> {
    let mut categories = tenant.repo::<Category>().list().await?;
    sort_categories(&mut categories);
    Ok(categories)
}

pub async fn create_category(tenant: &Tenant, input: &CategoryInput) -> ServiceResult<Category> {
    let category = Category::create(input)?;
    tenant.repo::<Category>().save(&category).await?;
    Ok(category)
}

pub async fn update_category(tenant: &Tenant, id: &str, input: &CategoryInput) -> ServiceResult<Category> {
    let repo = tenant.repo::<Category>();
    let mut category = repo.get(id).await?.ok_or_else(|| not_found("category", id))?;
    category.update(input)?;
    repo.save(&category).await?;
    Ok(category)
}

/// Products keep their `category_id`; storefronts treat unknown ids as uncategorised.
pub async fn delete_category(tenant: &Tenant, id: &str) -> ServiceResult<()> {
    if !tenant.repo::<Category>().delete(id).await? {
        return Err(not_found("category", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use crate::domain::aggregates::ProductStatus;
    use crate::domain::value_objects::StoreId;
    use crate::realtime::EventBus;
    use crate::services::ServiceError;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn tenant() -> Tenant {
        Tenant::new(StoreId::new("loja").unwrap(), Arc::new(MemoryDocumentStore::default()), EventBus::new(None))
    }

    fn input(name: &str) -> ProductInput {
        ProductInput { name: name.into(), price: Decimal::new(4990, 2), stock: 3, status: Some(ProductStatus::Active), ..Default::default() }
    }

    #[tokio::test]
    async fn test_storefront_only_sees_active_products() {
        let t = tenant();
        let visible = create(&t, &input("Vestido Floral")).await.unwrap();
        let draft = create(&t, &ProductInput { status: Some(ProductStatus::Draft), ..input("Saia") }).await.unwrap();

        let public = list_public(&t, &ProductFilter::default()).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id(), visible.id());
        assert_eq!(list_all(&t, &ProductFilter::default()).await.unwrap().len(), 2);
        assert!(matches!(get_public(&t, draft.id()).await, Err(ServiceError::NotFound { .. })));

        publish(&t, draft.id()).await.unwrap();
        assert_eq!(list_public(&t, &ProductFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_filters() {
        let t = tenant();
        let cat = create_category(&t, &CategoryInput { name: "Vestidos".into(), ..Default::default() }).await.unwrap();
        create(&t, &ProductInput { category_id: Some(cat.id.clone()), featured: true, ..input("Vestido Longo") }).await.unwrap();
        create(&t, &input("Bolsa de Palha")).await.unwrap();

        let by_category = ProductFilter { category: Some(cat.id.clone()), ..Default::default() };
        assert_eq!(list_public(&t, &by_category).await.unwrap().len(), 1);
        let search = ProductFilter { search: Some("palha".into()), ..Default::default() };
        assert_eq!(list_public(&t, &search).await.unwrap()[0].name(), "Bolsa de Palha");
        let featured = ProductFilter { featured: Some(true), ..Default::default() };
        assert_eq!(list_public(&t, &featured).await.unwrap()[0].name(), "Vestido Longo");
    }

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let t = tenant();
        let err = create(&t, &ProductInput { category_id: Some("nope".into()), ..input("X") }).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "category", .. }));
    }

    #[tokio::test]
    async fn test_adjust_stock_never_negative() {
        let t = tenant();
        let p = create(&t, &input("Brinco")).await.unwrap();
        assert_eq!(adjust_stock(&t, p.id(), 2).await.unwrap().stock().value(), 5);
        assert!(matches!(adjust_stock(&t, p.id(), -6).await, Err(ServiceError::Product(_))));
        assert_eq!(get(&t, p.id()).await.unwrap().stock().value(), 5);
    }

    #[tokio::test]
    async fn test_categories_sorted_and_deleted() {
        let t = tenant();
        create_category(&t, &CategoryInput { name: "Bolsas".into(), position: 2, ..Default::default() }).await.unwrap();
        let first = create_category(&t, &CategoryInput { name: "Vestidos".into(), position: 1, ..Default::default() }).await.unwrap();
        assert_eq!(list_categories(&t).await.unwrap()[0].name, "Vestidos");
        delete_category(&t, &first.id).await.unwrap();
        assert!(matches!(delete_category(&t, &first.id).await, Err(ServiceError::NotFound { .. })));
        assert_eq!(list_categories(&t).await.unwrap().len(), 1);
    }
}

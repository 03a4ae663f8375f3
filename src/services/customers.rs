//! Customer records.

use super::{not_found, ServiceError, ServiceResult};
use crate::db::Tenant;
use crate::domain::aggregates::{Customer, CustomerInput};
use crate::domain::value_objects::WhatsAppNumber;

/// Sorted by name; `search` matches name, phone or email.
pub async fn list(tenant: &Tenant, search: Option<&str>) -> ServiceResult<Vec<Customer>> {
    let query = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
    let mut customers: Vec<Customer> = tenant
        .repo::<Customer>()
        .list()
        .await?
        .into_iter()
        .filter(|c| {
            query.as_deref().map_or(true, |q| {
                c.name.to_lowercase().contains(q)
                    || c.phone.as_ref().is_some_and(|p| p.as_str().contains(q))
                    || c.email.as_deref().is_some_and(|e| e.to_lowercase().contains(q))
            })
        })
        .collect();
    customers.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(customers)
}

pub async fn get(tenant: &Tenant, id: &str) -> ServiceResult<Customer> {
    tenant.repo::<Customer>().get(id).await?.ok_or_else(|| not_found("customer", id))
}

pub async fn find_by_phone(tenant: &Tenant, phone: &WhatsAppNumber) -> ServiceResult<Option<Customer>> {
    let customers = tenant.repo::<Customer>().list().await?;
    Ok(customers.into_iter().find(|c| c.phone.as_ref() == Some(phone)))
}

pub async fn create(tenant: &Tenant, input: &CustomerInput) -> ServiceResult<Customer> {
    let customer = Customer::create(input)?;
    if let Some(phone) = &customer.phone {
        if find_by_phone(tenant, phone).await?.is_some() {
            return Err(ServiceError::Validation(format!("a customer with phone {phone} already exists")));
        }
    }
    tenant.repo::<Customer>().save(&customer).await?;
    Ok(customer)
}

pub async fn update(tenant: &Tenant, id: &str, input: &CustomerInput) -> ServiceResult<Customer> {
    let mut customer = get(tenant, id).await?;
    customer.update(input)?;
    tenant.repo::<Customer>().save(&customer).await?;
    Ok(customer)
}

pub async fn delete(tenant: &Tenant, id: &str) -> ServiceResult<()> {
    if !tenant.repo::<Customer>().delete(id).await? {
        return Err(not_found("customer", id));
    }
    Ok(())
}

/// Finds the customer by phone and refreshes their name, or creates one.
pub async fn upsert_by_phone(tenant: &Tenant, name: &str, phone: &str) -> ServiceResult<Customer> {
    let number = WhatsAppNumber::new(phone).map_err(|e| ServiceError::Validation(e.to_string()))?;
    let customer = match find_by_phone(tenant, &number).await? {
        Some(mut existing) => {
            if !name.trim().is_empty() {
                existing.name = name.trim().to_string();
            }
            existing
        }
        None => Customer::create(&CustomerInput { name: name.to_string(), phone: Some(phone.to_string()), ..Default::default() })?,
    };
    tenant.repo::<Customer>().save(&customer).await?;
    Ok(customer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use crate::domain::value_objects::StoreId;
    use crate::realtime::EventBus;
    use std::sync::Arc;

    fn tenant() -> Tenant {
        Tenant::new(StoreId::new("loja").unwrap(), Arc::new(MemoryDocumentStore::default()), EventBus::new(None))
    }

    #[tokio::test]
    async fn test_upsert_by_phone_matches_normalized_number() {
        let t = tenant();
        let first = upsert_by_phone(&t, "Ana", "(11) 98888-7777").await.unwrap();
        let again = upsert_by_phone(&t, "Ana Paula", "+55 11 98888-7777").await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.name, "Ana Paula");
        assert_eq!(list(&t, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_phone_rejected_on_create() {
        let t = tenant();
        let input = CustomerInput { name: "Ana".into(), phone: Some("11988887777".into()), ..Default::default() };
        create(&t, &input).await.unwrap();
        assert!(matches!(create(&t, &input).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_search() {
        let t = tenant();
        create(&t, &CustomerInput { name: "Beatriz".into(), email: Some("bia@example.com".into()), ..Default::default() }).await.unwrap();
        create(&t, &CustomerInput { name: "Carlos".into(), ..Default::default() }).await.unwrap();
        assert_eq!(list(&t, Some("BIA@")).await.unwrap()[0].name, "Beatriz");
        assert_eq!(list(&t, Some(" ")).await.unwrap().len(), 2);
    }
}

//! Tenant-scoped document storage.
//!
//! Every record is a JSON document addressed by `(store, collection, id)`.
//! Writes are upserts and the last write wins; there is no versioning.
//!
//! # Backends
//!
//! - [`PgDocumentStore`] - one JSONB table in `PostgreSQL` (see `migrations/`)
//! - [`MemoryDocumentStore`] - process-local map, used by tests and when no
//!   `DATABASE_URL` is configured

pub mod memory;
pub mod postgres;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::analytics::AnalyticsEvent;
use crate::domain::aggregates::{
    Cart, Category, ChatThread, Coupon, Customer, Employee, Product, Raffle, Sale,
};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::StoreId;
use crate::realtime::{ChangeKind, EventBus};

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested document was not found.
    #[error("not found")]
    NotFound,
}

/// Raw JSON document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, store: &StoreId, collection: &str, id: &str) -> Result<Option<JsonValue>, RepositoryError>;

    /// Inserts or replaces a document; reports whether it was created or updated.
    async fn put(&self, store: &StoreId, collection: &str, id: &str, doc: &JsonValue) -> Result<ChangeKind, RepositoryError>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, store: &StoreId, collection: &str, id: &str) -> Result<bool, RepositoryError>;

    /// All documents of a collection in creation order.
    async fn list(&self, store: &StoreId, collection: &str) -> Result<Vec<JsonValue>, RepositoryError>;

    async fn is_healthy(&self) -> bool;
}

/// A record type persisted in its own collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;
    fn document_id(&self) -> String;
}

impl Document for Product {
    const COLLECTION: &'static str = "products";
    fn document_id(&self) -> String { self.id().to_string() }
}

impl Document for Category {
    const COLLECTION: &'static str = "categories";
    fn document_id(&self) -> String { self.id.clone() }
}

impl Document for Cart {
    const COLLECTION: &'static str = "carts";
    fn document_id(&self) -> String { self.session_id().to_string() }
}

impl Document for Coupon {
    const COLLECTION: &'static str = "coupons";
    fn document_id(&self) -> String { self.code.clone() }
}

impl Document for Sale {
    const COLLECTION: &'static str = "sales";
    fn document_id(&self) -> String { self.id().to_string() }
}

impl Document for Customer {
    const COLLECTION: &'static str = "customers";
    fn document_id(&self) -> String { self.id.clone() }
}

impl Document for Employee {
    const COLLECTION: &'static str = "employees";
    fn document_id(&self) -> String { self.id.clone() }
}

impl Document for Raffle {
    const COLLECTION: &'static str = "raffles";
    fn document_id(&self) -> String { self.id().to_string() }
}

impl Document for ChatThread {
    const COLLECTION: &'static str = "chat_threads";
    fn document_id(&self) -> String { self.session_id().to_string() }
}

impl Document for AnalyticsEvent {
    const COLLECTION: &'static str = "analytics_events";
    fn document_id(&self) -> String { self.id.clone() }
}

/// Everything an operation needs to work on one tenant's data.
#[derive(Clone)]
pub struct Tenant {
    id: StoreId,
    docs: Arc<dyn DocumentStore>,
    bus: EventBus,
}

impl Tenant {
    pub fn new(id: StoreId, docs: Arc<dyn DocumentStore>, bus: EventBus) -> Self { Self { id, docs, bus } }

    pub fn id(&self) -> &StoreId { &self.id }
    pub fn docs(&self) -> &Arc<dyn DocumentStore> { &self.docs }
    pub fn bus(&self) -> &EventBus { &self.bus }

    pub fn repo<T: Document>(&self) -> Repository<T> {
        Repository { tenant: self.clone(), _marker: PhantomData }
    }

    /// Forwards events drained from an aggregate.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        if !events.is_empty() {
            self.bus.domain(&self.id, events).await;
        }
    }
}

/// Typed access to one collection of one tenant. Writes emit change events.
pub struct Repository<T> {
    tenant: Tenant,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Repository<T> {
    pub async fn get(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        match self.tenant.docs.get(&self.tenant.id, T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn require(&self, id: &str) -> Result<T, RepositoryError> {
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    pub async fn save(&self, doc: &T) -> Result<(), RepositoryError> {
        let id = doc.document_id();
        let value = serde_json::to_value(doc)?;
        let kind = self.tenant.docs.put(&self.tenant.id, T::COLLECTION, &id, &value).await?;
        self.tenant.bus.change(&self.tenant.id, T::COLLECTION, &id, kind).await;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let deleted = self.tenant.docs.delete(&self.tenant.id, T::COLLECTION, id).await?;
        if deleted {
            self.tenant.bus.change(&self.tenant.id, T::COLLECTION, id, ChangeKind::Deleted).await;
        }
        Ok(deleted)
    }

    /// All documents; entries that no longer deserialize are skipped with a warning.
    pub async fn list(&self) -> Result<Vec<T>, RepositoryError> {
        let docs = self.tenant.docs.list(&self.tenant.id, T::COLLECTION).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| match serde_json::from_value(doc) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(store = %self.tenant.id, collection = T::COLLECTION, error = %e, "skipping unreadable document");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::CategoryInput;

    fn tenant(name: &str, docs: Arc<dyn DocumentStore>) -> Tenant {
        Tenant::new(StoreId::new(name).unwrap(), docs, EventBus::new(None))
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let docs: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::default());
        let a = tenant("loja-a", docs.clone());
        let b = tenant("loja-b", docs);
        let cat = Category::create(&CategoryInput { name: "Bolsas".into(), ..Default::default() }).unwrap();
        a.repo::<Category>().save(&cat).await.unwrap();
        assert_eq!(a.repo::<Category>().list().await.unwrap().len(), 1);
        assert!(b.repo::<Category>().get(&cat.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_emits_change_events() {
        let t = tenant("loja", Arc::new(MemoryDocumentStore::default()));
        let mut rx = t.bus().subscribe();
        let mut cat = Category::create(&CategoryInput { name: "Bolsas".into(), ..Default::default() }).unwrap();
        let repo = t.repo::<Category>();
        repo.save(&cat).await.unwrap();
        cat.position = 3;
        repo.save(&cat).await.unwrap();
        assert!(repo.delete(&cat.id).await.unwrap());
        assert!(!repo.delete(&cat.id).await.unwrap());
        assert_eq!(rx.recv().await.unwrap().subject(), "vitrine.loja.categories.created");
        assert_eq!(rx.recv().await.unwrap().subject(), "vitrine.loja.categories.updated");
        assert_eq!(rx.recv().await.unwrap().subject(), "vitrine.loja.categories.deleted");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_require_missing() {
        let t = tenant("loja", Arc::new(MemoryDocumentStore::default()));
        assert!(matches!(t.repo::<Product>().require("nope").await, Err(RepositoryError::NotFound)));
    }
}

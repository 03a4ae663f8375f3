//! In-memory document store.

use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use super::{DocumentStore, RepositoryError};
use crate::domain::value_objects::StoreId;
use crate::realtime::ChangeKind;

type CollectionKey = (String, String);

/// Documents per `(store, collection)`, indexed by id and kept in insertion order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<CollectionKey, IndexMap<String, JsonValue>>>,
}

fn key(store: &StoreId, collection: &str) -> CollectionKey {
    (store.as_str().to_string(), collection.to_string())
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, store: &StoreId, collection: &str, id: &str) -> Result<Option<JsonValue>, RepositoryError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&key(store, collection))
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn put(&self, store: &StoreId, collection: &str, id: &str, doc: &JsonValue) -> Result<ChangeKind, RepositoryError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(key(store, collection)).or_default();
        match docs.insert(id.to_string(), doc.clone()) {
            Some(_) => Ok(ChangeKind::Updated),
            None => Ok(ChangeKind::Created),
        }
    }

    async fn delete(&self, store: &StoreId, collection: &str, id: &str) -> Result<bool, RepositoryError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&key(store, collection)) else { return Ok(false) };
        Ok(docs.shift_remove(id).is_some())
    }

    async fn list(&self, store: &StoreId, collection: &str) -> Result<Vec<JsonValue>, RepositoryError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&key(store, collection))
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn is_healthy(&self) -> bool { true }
}

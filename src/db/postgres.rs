//! `PostgreSQL` document store.
//!
//! ```sql
//! CREATE TABLE documents (
//!     store_id   TEXT NOT NULL,
//!     collection TEXT NOT NULL,
//!     id         TEXT NOT NULL,
//!     data       JSONB NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     PRIMARY KEY (store_id, collection, id)
//! );
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{DocumentStore, RepositoryError};
use crate::domain::value_objects::StoreId;
use crate::realtime::ChangeKind;

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Connects and runs pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn connect(database_url: &SecretString) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url.expose_secret())
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| RepositoryError::Database(e.into()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, store: &StoreId, collection: &str, id: &str) -> Result<Option<JsonValue>, RepositoryError> {
        let doc = sqlx::query_scalar::<_, JsonValue>(
            "SELECT data FROM documents WHERE store_id = $1 AND collection = $2 AND id = $3",
        )
        .bind(store.as_str())
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }

    async fn put(&self, store: &StoreId, collection: &str, id: &str, doc: &JsonValue) -> Result<ChangeKind, RepositoryError> {
        // xmax is zero only for freshly inserted rows.
        let inserted = sqlx::query_scalar::<_, bool>(
            "INSERT INTO documents (store_id, collection, id, data, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, NOW(), NOW()) \
             ON CONFLICT (store_id, collection, id) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW() \
             RETURNING (xmax = 0)",
        )
        .bind(store.as_str())
        .bind(collection)
        .bind(id)
        .bind(doc)
        .fetch_one(&self.pool)
        .await?;
        Ok(if inserted { ChangeKind::Created } else { ChangeKind::Updated })
    }

    async fn delete(&self, store: &StoreId, collection: &str, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE store_id = $1 AND collection = $2 AND id = $3")
            .bind(store.as_str())
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, store: &StoreId, collection: &str) -> Result<Vec<JsonValue>, RepositoryError> {
        let docs = sqlx::query_scalar::<_, JsonValue>(
            "SELECT data FROM documents WHERE store_id = $1 AND collection = $2 ORDER BY created_at, id",
        )
        .bind(store.as_str())
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;
        Ok(docs)
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

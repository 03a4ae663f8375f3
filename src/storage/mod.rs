//! Object storage for uploaded media.
//!
//! Objects are addressed by slash-separated keys that always start with the
//! store id, e.g. `loja/products/0190c7a2-....jpg`.

pub mod imaging;
pub mod local;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::StoreId;

pub use imaging::{prepare_for_upload, PreparedImage, DEFAULT_MAX_DIMENSION, MAX_UPLOAD_BYTES};
pub use local::LocalObjectStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
}

/// Bytes written so far during an upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
    pub bytes_written: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        u8::try_from(self.bytes_written.min(self.total_bytes) * 100 / self.total_bytes).unwrap_or(100)
    }
}

pub type ProgressCallback<'a> = &'a (dyn Fn(UploadProgress) + Send + Sync);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub size: u64,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `bytes` under `key`, replacing any existing object.
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<StoredObject, StorageError>;

    /// Returns `false` when the object did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Public URL of an object.
    fn url_for(&self, key: &str) -> String;
}

/// A fresh key under the store's folder.
pub fn object_key(store: &StoreId, folder: &str, extension: &str) -> String {
    format!("{store}/{folder}/{}.{extension}", Uuid::now_v7())
}

/// Rejects keys that could escape the store's namespace.
pub fn validate_key(store: &StoreId, key: &str) -> Result<(), StorageError> {
    let valid_segments = key
        .split('/')
        .all(|s| !s.is_empty() && s != "." && s != ".." && !s.contains('\\'));
    let in_store = key.split('/').next() == Some(store.as_str());
    if valid_segments && in_store && key.contains('/') {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

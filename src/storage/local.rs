//! Filesystem-backed object store; files are served by the HTTP layer under
//! the configured public URL.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

use super::{ObjectStore, ProgressCallback, StorageError, StoredObject, UploadProgress};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self { root: root.into(), public_url: public_url.into().trim_end_matches('/').to_string() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() || key.starts_with('/') || key.split('/').any(|s| s.is_empty() || s == "..") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    #[instrument(skip(self, bytes, progress), fields(size = bytes.len()))]
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<StoredObject, StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to a sibling file and rename so readers never see partial objects.
        let partial = path.with_extension("part");
        let total_bytes = bytes.len() as u64;
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut bytes_written = 0u64;
        for chunk in bytes.chunks(CHUNK_SIZE) {
            file.write_all(chunk).await?;
            bytes_written += chunk.len() as u64;
            if let Some(report) = progress {
                report(UploadProgress { bytes_written, total_bytes });
            }
        }
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&partial, &path).await?;

        tracing::debug!(key, "object stored");
        Ok(StoredObject {
            key: key.to_string(),
            url: self.url_for(key),
            content_type: content_type.to_string(),
            size: total_bytes,
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        match tokio::fs::remove_file(self.path_for(key)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{key}", self.public_url)
    }
}

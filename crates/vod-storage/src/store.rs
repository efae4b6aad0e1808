//! The `ContentStore` capability trait.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

/// Narrow interface over an S3-compatible object store.
///
/// The orchestrator and the manifest generator only touch this trait, so
/// they run unchanged against the production adapter or the in-memory
/// store used by tests. Buckets are addressed per call because jobs carry
/// their own bucket name.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store an object.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Fetch an object's bytes. `NotFound` when the key is absent.
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Existence probe (HEAD, not a content fetch).
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// List object keys under a prefix, in the store's listing order.
    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>>;

    /// Download an object to a local file, creating parent directories.
    async fn download_to_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> StorageResult<()> {
        let bytes = self.get(bucket, key).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::download_failed(format!("Failed to create directory: {}", e))
            })?;
        }
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| StorageError::download_failed(format!("Failed to write file: {}", e)))?;
        Ok(())
    }

    /// Upload a local file as an object.
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::upload_failed(format!("Failed to read file: {}", e)))?;
        self.put(bucket, key, bytes, content_type).await
    }
}

//! In-memory content store for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::store::ContentStore;

/// A `ContentStore` backed by a map. Listing order is lexicographic by key,
/// matching an S3 listing.
#[derive(Default)]
pub struct MemoryContentStore {
    objects: Mutex<BTreeMap<(String, String), (Vec<u8>, String)>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all buckets.
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Content type recorded for an object, if present.
    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(_, ct)| ct.clone())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            (bytes, content_type.to_string()),
        );
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_roundtrip_and_listing_order() {
        let store = MemoryContentStore::new();
        store
            .put("b", "t/v/segment_001.ts", vec![1], "video/MP2T")
            .await
            .unwrap();
        store
            .put("b", "t/v/segment_000.ts", vec![0], "video/MP2T")
            .await
            .unwrap();

        assert_eq!(store.get("b", "t/v/segment_000.ts").await.unwrap(), vec![0]);
        assert!(store.exists("b", "t/v/segment_001.ts").await.unwrap());
        assert!(!store.exists("b", "t/v/other").await.unwrap());

        let keys = store.list("b", "t/v/").await.unwrap();
        assert_eq!(keys, vec!["t/v/segment_000.ts", "t/v/segment_001.ts"]);
        assert!(store.list("other-bucket", "t/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemoryContentStore::new();
        let err = store.get("b", "missing").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}

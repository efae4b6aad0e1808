//! S3-compatible object store client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::ContentStore;

/// Configuration for the object store client.
///
/// The internal endpoint is what the store actually trusts for signing;
/// the public base URL is what clients are allowed to see (see `signing`).
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    /// Internal S3 API endpoint (e.g. http://minio:9000).
    pub endpoint_url: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Region (MinIO accepts any value).
    pub region: String,
    /// Public-facing base URL signed URLs are rewritten to
    /// (e.g. http://localhost:8080/play).
    pub public_base_url: String,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://minio:9000".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            public_base_url: "http://localhost:8080/play".to_string(),
        }
    }
}

impl ObjectStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint_url: std::env::var("MINIO_ENDPOINT").unwrap_or(defaults.endpoint_url),
            access_key_id: std::env::var("MINIO_ACCESS_KEY").unwrap_or(defaults.access_key_id),
            secret_access_key: std::env::var("MINIO_SECRET_KEY")
                .unwrap_or(defaults.secret_access_key),
            region: std::env::var("MINIO_REGION").unwrap_or(defaults.region),
            public_base_url: std::env::var("MINIO_PUBLIC_BASE_URL")
                .unwrap_or(defaults.public_base_url),
        }
    }
}

/// S3-compatible storage client (MinIO in the reference deployment).
#[derive(Clone)]
pub struct ObjectStoreClient {
    client: Client,
    public_base_url: String,
}

impl ObjectStoreClient {
    /// Create a new client from configuration.
    pub fn new(config: ObjectStoreConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "vodpress",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            public_base_url: config.public_base_url,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self::new(ObjectStoreConfig::from_env())
    }

    /// Public base URL signed URLs are rewritten to.
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Generate a presigned GET URL against the internal endpoint.
    pub async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }
}

#[async_trait]
impl ContentStore for ObjectStoreClient {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}/{}", bytes.len(), bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        debug!("Downloading {}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(e.to_string()))
                }
            }
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        debug!("Listing {}/{}", bucket, prefix);

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::ListFailed(e.to_string()))?;

            if let Some(ref contents) = response.contents {
                for obj in contents {
                    if let Some(key) = &obj.key {
                        keys.push(key.clone());
                    }
                }
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(keys)
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} to {}/{}", path.display(), bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}/{}", path.display(), bucket, key);
        Ok(())
    }
}

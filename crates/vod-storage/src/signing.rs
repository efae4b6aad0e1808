//! Signed URL generation with public-origin rewriting.
//!
//! Signing must happen against the endpoint the store actually trusts, but
//! clients must never see internal infrastructure addresses. So each URL is
//! presigned against the internal endpoint, then its scheme/host/path are
//! rewritten to the configured public base while the query-string signature
//! parameters are left untouched. A reverse proxy that forwards
//! `{public_base_path}/{bucket}/{key}` back to the internal endpoint keeps
//! the signature valid.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::client::ObjectStoreClient;
use crate::error::{StorageError, StorageResult};

/// TTL for segment and variant-playlist URLs embedded in playlists (1 hour).
pub const SEGMENT_URL_TTL: Duration = Duration::from_secs(3600);

/// TTL for the top-level playback manifest URL (1 hour). Decoupled from the
/// 5-minute playback response cache, so a cached response may point at URLs
/// with as little as 55 minutes of remaining validity.
pub const MANIFEST_URL_TTL: Duration = Duration::from_secs(3600);

/// Time-limited, credential-scoped URL producer.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    /// Produce a signed URL for one object, rewritten to the public origin.
    async fn sign(&self, bucket: &str, key: &str, ttl: Duration) -> StorageResult<Url>;
}

/// Rewrite a presigned URL's origin and path prefix to the public base,
/// preserving the bucket/key path suffix and the signature query string.
pub fn rewrite_origin(
    presigned: &Url,
    public_base: &Url,
    bucket: &str,
    key: &str,
) -> StorageResult<Url> {
    let mut url = presigned.clone();

    url.set_scheme(public_base.scheme())
        .map_err(|_| StorageError::PresignFailed("invalid public scheme".to_string()))?;
    url.set_host(public_base.host_str())
        .map_err(|e| StorageError::PresignFailed(format!("invalid public host: {}", e)))?;
    url.set_port(public_base.port())
        .map_err(|_| StorageError::PresignFailed("invalid public port".to_string()))?;

    let base_path = public_base.path().trim_end_matches('/');
    url.set_path(&format!("{}/{}/{}", base_path, bucket, key));

    Ok(url)
}

/// Production signer: presign against the internal store endpoint, then
/// rewrite the origin to the configured public base URL.
#[derive(Clone)]
pub struct PresignedUrlSigner {
    client: ObjectStoreClient,
    public_base: Url,
}

impl PresignedUrlSigner {
    pub fn new(client: ObjectStoreClient) -> StorageResult<Self> {
        let public_base = Url::parse(client.public_base_url()).map_err(|e| {
            StorageError::config_error(format!("invalid public base URL: {}", e))
        })?;
        Ok(Self {
            client,
            public_base,
        })
    }
}

#[async_trait]
impl UrlSigner for PresignedUrlSigner {
    async fn sign(&self, bucket: &str, key: &str, ttl: Duration) -> StorageResult<Url> {
        let presigned = self.client.presign_get(bucket, key, ttl).await?;
        let presigned = Url::parse(&presigned)
            .map_err(|e| StorageError::PresignFailed(format!("unparsable presigned URL: {}", e)))?;
        rewrite_origin(&presigned, &self.public_base, bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presigned_fixture() -> Url {
        Url::parse(
            "http://minio:9000/video-uploads/transcoded/clip1/playlist.m3u8\
             ?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Credential=minioadmin%2F20240501\
             &X-Amz-Expires=3600&X-Amz-Signature=abc123",
        )
        .unwrap()
    }

    #[test]
    fn rewrites_origin_and_path_prefix() {
        let public_base = Url::parse("http://localhost:8080/play").unwrap();
        let url = rewrite_origin(
            &presigned_fixture(),
            &public_base,
            "video-uploads",
            "transcoded/clip1/playlist.m3u8",
        )
        .unwrap();

        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(8080));
        assert_eq!(
            url.path(),
            "/play/video-uploads/transcoded/clip1/playlist.m3u8"
        );
    }

    #[test]
    fn preserves_signature_query_untouched() {
        let public_base = Url::parse("https://cdn.example.com/play/").unwrap();
        let before = presigned_fixture();
        let after = rewrite_origin(
            &before,
            &public_base,
            "video-uploads",
            "transcoded/clip1/playlist.m3u8",
        )
        .unwrap();

        assert_eq!(after.query(), before.query());
        assert!(after.query().unwrap().contains("X-Amz-Signature=abc123"));
    }

    #[test]
    fn never_leaks_internal_endpoint() {
        let public_base = Url::parse("https://cdn.example.com/play").unwrap();
        let url = rewrite_origin(
            &presigned_fixture(),
            &public_base,
            "video-uploads",
            "transcoded/clip1/720p/segment_000.ts",
        )
        .unwrap();

        let rendered = url.to_string();
        assert!(!rendered.contains("minio"));
        assert!(!rendered.contains(":9000"));
        assert!(rendered.starts_with("https://cdn.example.com/play/"));
    }
}

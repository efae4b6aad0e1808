//! Playback manifest resolution.
//!
//! The resolver never reads playlist bodies. It checks the status record,
//! probes that the master playlist object exists, and hands out one signed
//! URL for it; segment and variant URLs inside the playlists were signed at
//! generation time.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vod_db::StatusStore;
use vod_models::{master_playlist_key, VideoId, VideoStatus};
use vod_storage::{ContentStore, UrlSigner, MANIFEST_URL_TTL};

use crate::cache::{manifest_cache_key, ResponseCache, PLAYBACK_CACHE_TTL};
use crate::error::{ApiError, ApiResult};

/// Playback response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackResponse {
    pub success: bool,
    pub video_id: String,
    /// Signed, public-origin URL for the master playlist.
    pub manifest_url: String,
    /// Remaining validity of `manifest_url` in seconds, at signing time.
    pub expires_in: u64,
    /// RFC 3339 resolution time. A cached response keeps its original
    /// timestamp, which is how clients can tell they got a cached hit.
    pub timestamp: String,
}

/// Resolves playback manifests with a short-TTL response cache in front.
pub struct PlaybackService {
    status: Arc<dyn StatusStore>,
    store: Arc<dyn ContentStore>,
    signer: Arc<dyn UrlSigner>,
    cache: Arc<dyn ResponseCache>,
    bucket: String,
}

impl PlaybackService {
    pub fn new(
        status: Arc<dyn StatusStore>,
        store: Arc<dyn ContentStore>,
        signer: Arc<dyn UrlSigner>,
        cache: Arc<dyn ResponseCache>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            status,
            store,
            signer,
            cache,
            bucket: bucket.into(),
        }
    }

    /// Resolve the playback manifest URL for one video.
    ///
    /// Cached responses are served verbatim within the cache TTL, so the
    /// worst case remaining URL validity is the URL TTL minus the cache TTL.
    pub async fn resolve_manifest(&self, video_id: &str) -> ApiResult<PlaybackResponse> {
        validate_video_id(video_id)?;

        let cache_key = manifest_cache_key(video_id);
        if let Some(cached) = self.cache.get(&cache_key).await {
            // A corrupt cache entry falls through to a fresh resolution.
            if let Ok(response) = serde_json::from_str::<PlaybackResponse>(&cached) {
                debug!("Serving cached playback response for {}", video_id);
                return Ok(response);
            }
        }

        let id = VideoId::from(video_id);
        let record = self
            .status
            .get_by_video_id(&id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Video {} not found", video_id)))?;

        if record.status != VideoStatus::Ready {
            return Err(ApiError::NotReady {
                video_id: video_id.to_string(),
                status: record.status,
            });
        }

        // Status says ready but the object is gone: surface as not found
        // rather than handing out a signed URL to nothing.
        let master_key = master_playlist_key(video_id);
        if !self.store.exists(&self.bucket, &master_key).await? {
            return Err(ApiError::not_found(format!(
                "Manifest for video {} not found",
                video_id
            )));
        }

        let url = self
            .signer
            .sign(&self.bucket, &master_key, MANIFEST_URL_TTL)
            .await?;

        let response = PlaybackResponse {
            success: true,
            video_id: video_id.to_string(),
            manifest_url: url.to_string(),
            expires_in: MANIFEST_URL_TTL.as_secs(),
            timestamp: Utc::now().to_rfc3339(),
        };

        self.cache
            .set(&cache_key, &serde_json::to_string(&response)?, PLAYBACK_CACHE_TTL)
            .await;

        info!("Resolved playback manifest for {}", video_id);
        Ok(response)
    }
}

/// Path-parameter hygiene: identifiers are single key segments.
fn validate_video_id(video_id: &str) -> ApiResult<()> {
    if video_id.trim().is_empty() || video_id.len() > 255 {
        return Err(ApiError::bad_request("invalid video id"));
    }
    if !video_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ApiError::bad_request("invalid video id"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use url::Url;

    use crate::cache::MemoryResponseCache;
    use vod_db::MemoryStatusStore;
    use vod_models::VideoRecord;
    use vod_storage::{MemoryContentStore, StorageResult};

    struct FakeSigner;

    #[async_trait]
    impl UrlSigner for FakeSigner {
        async fn sign(&self, bucket: &str, key: &str, _ttl: Duration) -> StorageResult<Url> {
            Ok(Url::parse(&format!(
                "https://cdn.example.com/play/{}/{}?X-Amz-Signature=test",
                bucket, key
            ))
            .unwrap())
        }
    }

    struct Harness {
        service: PlaybackService,
        store: Arc<MemoryContentStore>,
        status: Arc<MemoryStatusStore>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryContentStore::new());
        let status = Arc::new(MemoryStatusStore::new());
        let service = PlaybackService::new(
            status.clone(),
            store.clone(),
            Arc::new(FakeSigner),
            Arc::new(MemoryResponseCache::new()),
            "video-uploads",
        );
        Harness {
            service,
            store,
            status,
        }
    }

    async fn seed_ready(h: &Harness, video_id: &str) {
        let mut record = VideoRecord::new(VideoId::from(video_id));
        record.status = VideoStatus::Ready;
        h.status.insert(record);
        h.store
            .put(
                "video-uploads",
                &master_playlist_key(video_id),
                b"#EXTM3U".to_vec(),
                "application/vnd.apple.mpegurl",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ready_video_resolves_to_signed_public_url() {
        let h = harness();
        seed_ready(&h, "clip1").await;

        let response = h.service.resolve_manifest("clip1").await.unwrap();
        assert!(response.success);
        assert_eq!(response.video_id, "clip1");
        assert_eq!(response.expires_in, 3600);
        assert!(response
            .manifest_url
            .starts_with("https://cdn.example.com/play/video-uploads/transcoded/clip1/"));
    }

    #[tokio::test]
    async fn unknown_video_is_not_found() {
        let h = harness();
        let err = h.service.resolve_manifest("ghost").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn not_ready_video_echoes_current_status() {
        let h = harness();
        let mut record = VideoRecord::new(VideoId::from("clip1"));
        record.status = VideoStatus::Transcoding;
        h.status.insert(record);

        let err = h.service.resolve_manifest("clip1").await.unwrap_err();
        match err {
            ApiError::NotReady { video_id, status } => {
                assert_eq!(video_id, "clip1");
                assert_eq!(status, VideoStatus::Transcoding);
            }
            other => panic!("expected NotReady, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn ready_without_manifest_object_is_not_found() {
        let h = harness();
        let mut record = VideoRecord::new(VideoId::from("clip1"));
        record.status = VideoStatus::Ready;
        h.status.insert(record);
        // No master playlist object in the store.

        let err = h.service.resolve_manifest("clip1").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn cached_response_is_served_verbatim() {
        let h = harness();
        seed_ready(&h, "clip1").await;

        let first = h.service.resolve_manifest("clip1").await.unwrap();

        // Even a status flip does not reach through the cache window.
        h.status
            .update_status(&VideoId::from("clip1"), VideoStatus::Failed)
            .await
            .unwrap();

        let second = h.service.resolve_manifest("clip1").await.unwrap();
        assert_eq!(second.timestamp, first.timestamp);
        assert_eq!(second.manifest_url, first.manifest_url);
    }

    #[tokio::test]
    async fn malformed_ids_are_bad_requests() {
        let h = harness();
        for id in ["", "  ", "a/b", "../etc", "clip\u{7f}"] {
            let err = h.service.resolve_manifest(id).await.unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)), "id {:?}", id);
        }
    }
}

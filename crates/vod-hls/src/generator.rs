//! Manifest generation.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use vod_models::{
    master_playlist_key, variant_playlist_key, variant_prefix, VideoId, RENDITIONS,
};
use vod_storage::{ContentStore, StorageError, UrlSigner, SEGMENT_URL_TTL};

use crate::playlist::{
    build_master_playlist, build_variant_playlist, MasterEntry, PLAYLIST_CONTENT_TYPE,
};

pub type HlsResult<T> = Result<T, HlsError>;

#[derive(Debug, Error)]
pub enum HlsError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Builds and uploads both playlist tiers for one video.
///
/// Not incremental: every invocation rebuilds everything from the current
/// segment listings, so the manifest always reflects exactly the segments
/// present at generation time. Listing-API eventual consistency is the only
/// risk window.
pub struct ManifestGenerator {
    store: Arc<dyn ContentStore>,
    signer: Arc<dyn UrlSigner>,
}

impl ManifestGenerator {
    pub fn new(store: Arc<dyn ContentStore>, signer: Arc<dyn UrlSigner>) -> Self {
        Self { store, signer }
    }

    /// Regenerate and upload every playlist for `video_id`.
    ///
    /// Renditions with zero listed segments are omitted from the master
    /// playlist; that is not an error.
    pub async fn generate_and_upload(&self, bucket: &str, video_id: &VideoId) -> HlsResult<()> {
        let mut master_entries = Vec::new();

        for rendition in &RENDITIONS {
            let prefix = variant_prefix(video_id.as_str(), rendition.name);
            let segments = self.list_segments(bucket, &prefix).await?;

            if segments.is_empty() {
                warn!("No segments found in {}, omitting rendition", prefix);
                continue;
            }

            let mut segment_urls = Vec::with_capacity(segments.len());
            for key in &segments {
                let url = self.signer.sign(bucket, key, SEGMENT_URL_TTL).await?;
                segment_urls.push(url.to_string());
            }

            let variant_body = build_variant_playlist(&segment_urls);
            let variant_key = variant_playlist_key(video_id.as_str(), rendition.name);
            self.store
                .put(
                    bucket,
                    &variant_key,
                    variant_body.into_bytes(),
                    PLAYLIST_CONTENT_TYPE,
                )
                .await?;

            let variant_url = self
                .signer
                .sign(bucket, &variant_key, SEGMENT_URL_TTL)
                .await?;

            master_entries.push(MasterEntry {
                rendition: *rendition,
                variant_url: variant_url.to_string(),
            });
        }

        let master_key = master_playlist_key(video_id.as_str());
        let master_body = build_master_playlist(&master_entries);
        self.store
            .put(
                bucket,
                &master_key,
                master_body.into_bytes(),
                PLAYLIST_CONTENT_TYPE,
            )
            .await?;

        info!(
            "Uploaded master playlist at {} ({} renditions)",
            master_key,
            master_entries.len()
        );
        Ok(())
    }

    /// List one rendition's segment objects in temporal order.
    ///
    /// Relies on zero-padded indices making lexicographic order equal
    /// temporal order (see the key helpers in vod-models).
    async fn list_segments(&self, bucket: &str, prefix: &str) -> HlsResult<Vec<String>> {
        let mut keys = self.store.list(bucket, prefix).await?;
        keys.retain(|k| k.ends_with(".ts") || k.ends_with(".m4s"));
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use url::Url;
    use vod_models::segment_key;
    use vod_storage::{MemoryContentStore, StorageResult};

    /// Deterministic signer: public origin, stable fake signature.
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

    fn generator(store: Arc<MemoryContentStore>) -> ManifestGenerator {
        ManifestGenerator::new(store, Arc::new(FakeSigner))
    }

    async fn seed_segments(store: &MemoryContentStore, video_id: &str, rendition: &str, n: u32) {
        for i in 0..n {
            store
                .put(
                    "video-uploads",
                    &segment_key(video_id, rendition, i),
                    vec![0u8; 8],
                    "video/MP2T",
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn full_ladder_produces_master_with_four_blocks() {
        let store = Arc::new(MemoryContentStore::new());
        for r in &RENDITIONS {
            seed_segments(&store, "clip1", r.name, 10).await;
        }

        generator(Arc::clone(&store))
            .generate_and_upload("video-uploads", &VideoId::from("clip1"))
            .await
            .unwrap();

        let master = String::from_utf8(
            store
                .get("video-uploads", "transcoded/clip1/playlist.m3u8")
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(master.matches("#EXT-X-STREAM-INF:").count(), 4);

        // Ladder order: 1080p, 720p, 480p, 360p.
        let positions: Vec<_> = ["1080p", "720p", "480p", "360p"]
            .iter()
            .map(|n| master.find(&format!("/{}/playlist.m3u8", n)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        for r in &RENDITIONS {
            let variant = String::from_utf8(
                store
                    .get(
                        "video-uploads",
                        &variant_playlist_key("clip1", r.name),
                    )
                    .await
                    .unwrap(),
            )
            .unwrap();
            assert_eq!(variant.matches("#EXTINF:6.0,").count(), 10);
            assert!(variant.ends_with("#EXT-X-ENDLIST"));
        }
    }

    #[tokio::test]
    async fn empty_rendition_is_omitted_not_fatal() {
        let store = Arc::new(MemoryContentStore::new());
        seed_segments(&store, "clip1", "1080p", 3).await;
        seed_segments(&store, "clip1", "360p", 3).await;
        // 720p and 480p have no segments at all.

        generator(Arc::clone(&store))
            .generate_and_upload("video-uploads", &VideoId::from("clip1"))
            .await
            .unwrap();

        let master = String::from_utf8(
            store
                .get("video-uploads", "transcoded/clip1/playlist.m3u8")
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(master.matches("#EXT-X-STREAM-INF:").count(), 2);
        assert!(master.contains("/1080p/playlist.m3u8"));
        assert!(!master.contains("/720p/playlist.m3u8"));

        // No variant playlist uploaded for the empty renditions.
        assert!(!store
            .exists("video-uploads", &variant_playlist_key("clip1", "720p"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn segments_are_listed_in_temporal_order() {
        let store = Arc::new(MemoryContentStore::new());
        // Insert out of order; listing is lexicographic.
        for i in [2u32, 0, 1] {
            store
                .put(
                    "video-uploads",
                    &segment_key("clip1", "720p", i),
                    vec![],
                    "video/MP2T",
                )
                .await
                .unwrap();
        }
        // A stray playlist under the prefix must not be treated as a segment.
        store
            .put(
                "video-uploads",
                &variant_playlist_key("clip1", "720p"),
                vec![],
                PLAYLIST_CONTENT_TYPE,
            )
            .await
            .unwrap();

        generator(Arc::clone(&store))
            .generate_and_upload("video-uploads", &VideoId::from("clip1"))
            .await
            .unwrap();

        let variant = String::from_utf8(
            store
                .get("video-uploads", &variant_playlist_key("clip1", "720p"))
                .await
                .unwrap(),
        )
        .unwrap();
        let seg_lines: Vec<_> = variant
            .lines()
            .filter(|l| l.contains("segment_"))
            .collect();
        assert_eq!(seg_lines.len(), 3);
        assert!(seg_lines[0].contains("segment_000.ts"));
        assert!(seg_lines[2].contains("segment_002.ts"));
    }

    #[tokio::test]
    async fn regeneration_is_idempotent_for_identical_segments() {
        let store = Arc::new(MemoryContentStore::new());
        seed_segments(&store, "clip1", "480p", 5).await;

        let gen = generator(Arc::clone(&store));
        gen.generate_and_upload("video-uploads", &VideoId::from("clip1"))
            .await
            .unwrap();
        let first = store
            .get("video-uploads", "transcoded/clip1/playlist.m3u8")
            .await
            .unwrap();

        gen.generate_and_upload("video-uploads", &VideoId::from("clip1"))
            .await
            .unwrap();
        let second = store
            .get("video-uploads", "transcoded/clip1/playlist.m3u8")
            .await
            .unwrap();

        // The fake signer is deterministic, so the bodies are identical;
        // in production only signatures/expiries differ.
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn signed_urls_carry_the_public_origin() {
        let store = Arc::new(MemoryContentStore::new());
        seed_segments(&store, "clip1", "720p", 1).await;

        generator(Arc::clone(&store))
            .generate_and_upload("video-uploads", &VideoId::from("clip1"))
            .await
            .unwrap();

        let variant = String::from_utf8(
            store
                .get("video-uploads", &variant_playlist_key("clip1", "720p"))
                .await
                .unwrap(),
        )
        .unwrap();
        assert!(variant.contains("https://cdn.example.com/play/video-uploads/"));
        assert!(!variant.contains("minio"));
    }
}

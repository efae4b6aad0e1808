//! Playback response cache.
//!
//! Caching sits in front of the playback resolver only; a cache outage
//! degrades to signing on every request, so both operations swallow their
//! errors after logging.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

/// How long a resolved playback response is served from cache. Much shorter
/// than the 1-hour URL TTL, so cached URLs always have most of their
/// validity left.
pub const PLAYBACK_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache key for one video's playback response.
pub fn manifest_cache_key(video_id: &str) -> String {
    format!("video:manifest:{}", video_id)
}

/// Best-effort string cache.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Fetch a cached value; `None` on miss, expiry, or cache failure.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value with a TTL. Failures are logged, never surfaced.
    async fn set(&self, key: &str, value: &str, ttl: Duration);
}

/// Redis-backed cache (GET / SET EX).
pub struct RedisResponseCache {
    client: redis::Client,
}

impl RedisResponseCache {
    pub fn new(redis_url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
        })
    }

    /// Create from the `REDIS_URL` environment variable.
    pub fn from_env() -> Result<Self, redis::RedisError> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url)
    }

    async fn try_get(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::AsyncCommands::get(&mut conn, key).await
    }

    async fn try_set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::AsyncCommands::set_ex(&mut conn, key, value, ttl.as_secs()).await
    }
}

#[async_trait]
impl ResponseCache for RedisResponseCache {
    async fn get(&self, key: &str) -> Option<String> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Cache get failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) {
        if let Err(e) = self.try_set(key, value, ttl).await {
            warn!("Cache set failed for {}: {}", key, e);
        }
    }
}

/// In-memory cache for tests, with real expiry semantics.
#[derive(Default)]
pub struct MemoryResponseCache {
    entries: std::sync::Mutex<std::collections::HashMap<String, (String, std::time::Instant)>>,
}

impl MemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for MemoryResponseCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).and_then(|(value, expires_at)| {
            if std::time::Instant::now() < *expires_at {
                Some(value.clone())
            } else {
                None
            }
        })
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let expires_at = std::time::Instant::now() + ttl;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), expires_at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_shape() {
        assert_eq!(manifest_cache_key("clip1"), "video:manifest:clip1");
    }

    #[tokio::test]
    async fn memory_cache_round_trip() {
        let cache = MemoryResponseCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test]
    async fn memory_cache_expires() {
        let cache = MemoryResponseCache::new();
        cache.set("k", "v", Duration::ZERO).await;
        assert_eq!(cache.get("k").await, None);
    }
}

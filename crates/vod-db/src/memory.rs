//! In-memory status store for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use vod_models::{VideoId, VideoRecord, VideoStatus};

use crate::error::{DbError, DbResult};
use crate::status_store::StatusStore;

/// A `StatusStore` backed by a map. Writes are last-write-wins, matching
/// the production store's behavior for concurrent jobs on one video.
#[derive(Default)]
pub struct MemoryStatusStore {
    records: Mutex<HashMap<String, VideoRecord>>,
    next_id: Mutex<i32>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing `create` bookkeeping.
    pub fn insert(&self, record: VideoRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.video_id.to_string(), record);
    }

    /// Current status of a video, if present.
    pub fn status_of(&self, video_id: &str) -> Option<VideoStatus> {
        self.records
            .lock()
            .unwrap()
            .get(video_id)
            .map(|r| r.status)
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn create(&self, record: &VideoRecord) -> DbResult<VideoRecord> {
        let mut records = self.records.lock().unwrap();
        let key = record.video_id.to_string();
        if records.contains_key(&key) {
            return Err(DbError::Duplicate(key));
        }

        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;

        let mut stored = record.clone();
        stored.id = Some(*next_id);
        records.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update_status(&self, video_id: &VideoId, status: VideoStatus) -> DbResult<()> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(video_id.as_str()) {
            Some(record) => {
                record.status = status;
                record.updated_at = Utc::now();
                Ok(())
            }
            None => Err(DbError::not_found(video_id.to_string())),
        }
    }

    async fn get_by_video_id(&self, video_id: &VideoId) -> DbResult<Option<VideoRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(video_id.as_str())
            .cloned())
    }

    async fn list_videos(&self, limit: i64, offset: i64) -> DbResult<Vec<VideoRecord>> {
        let records = self.records.lock().unwrap();
        let mut all: Vec<_> = records.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

//! Worker errors.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    #[error("Queue error: {0}")]
    Queue(#[from] vod_queue::QueueError),

    #[error("Database error: {0}")]
    Db(#[from] vod_db::DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] vod_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] vod_media::MediaError),

    #[error("Manifest error: {0}")]
    Hls(#[from] vod_hls::HlsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

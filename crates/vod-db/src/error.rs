//! Database error types.

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Video not found: {0}")]
    NotFound(String),

    #[error("Duplicate video_id: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn not_found(video_id: impl Into<String>) -> Self {
        Self::NotFound(video_id.into())
    }
}

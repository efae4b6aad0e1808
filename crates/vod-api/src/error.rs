//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use vod_models::VideoStatus;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Video {video_id} is not ready for playback (status: {status})")]
    NotReady {
        video_id: String,
        status: VideoStatus,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vod_storage::StorageError),

    #[error("Database error: {0}")]
    Db(#[from] vod_db::DbError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotReady { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_)
            | ApiError::Storage(_)
            | ApiError::Db(_)
            | ApiError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    /// Current video status, present only on the not-ready conflict.
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_)
            | ApiError::Storage(_)
            | ApiError::Db(_)
            | ApiError::Json(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let video_status = match &self {
            ApiError::NotReady { status, .. } => Some(status.to_string()),
            _ => None,
        };

        let body = ErrorResponse {
            detail,
            status: video_status,
        };

        (status_code, Json(body)).into_response()
    }
}

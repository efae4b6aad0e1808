//! Request handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use vod_models::VideoRecord;

use crate::error::ApiResult;
use crate::playback::PlaybackResponse;
use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<VideoRecord>,
    pub count: usize,
}

/// List videos, newest first.
pub async fn list_videos(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<VideoListResponse>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);

    let videos = state.status.list_videos(limit, offset).await?;
    let count = videos.len();

    Ok(Json(VideoListResponse { videos, count }))
}

/// Resolve the playback manifest URL for a video.
pub async fn get_playback_manifest(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<PlaybackResponse>> {
    let response = state.playback.resolve_manifest(&video_id).await?;
    Ok(Json(response))
}

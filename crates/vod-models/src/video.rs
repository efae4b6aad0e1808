//! Video record models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a video, derived from the uploaded filename
/// with its extension stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Derive from an uploaded filename by stripping the final extension.
    /// `clip1.mp4` becomes `clip1`; a name without a dot is used as-is.
    pub fn from_filename(filename: &str) -> Self {
        let name = match filename.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            _ => filename,
        };
        Self(name.to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Video processing status.
///
/// Transitions are monotone for a single job attempt:
/// `Uploaded -> Transcoding -> {Ready | Failed}`. The only exit from
/// `Failed` is a brand-new job for the same video re-entering the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Source object stored, waiting for a worker
    #[default]
    Uploaded,
    /// A worker is processing the video
    Transcoding,
    /// Rendition set and playlists are available
    Ready,
    /// Processing failed
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Transcoding => "transcoding",
            VideoStatus::Ready => "ready",
            VideoStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state for a job attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Ready | VideoStatus::Failed)
    }

    /// Check whether `next` is a valid pipeline transition from `self`.
    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        matches!(
            (self, next),
            (VideoStatus::Uploaded, VideoStatus::Transcoding)
                | (VideoStatus::Transcoding, VideoStatus::Ready)
                | (VideoStatus::Transcoding, VideoStatus::Failed)
                // A fresh job for the same video restarts the pipeline.
                | (VideoStatus::Failed, VideoStatus::Transcoding)
        )
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(VideoStatus::Uploaded),
            "transcoding" => Ok(VideoStatus::Transcoding),
            "ready" => Ok(VideoStatus::Ready),
            "failed" => Ok(VideoStatus::Failed),
            other => Err(format!("unknown video status: {}", other)),
        }
    }
}

/// A row in the `videos` table.
///
/// Created by the ingestion collaborator at upload time with status
/// `uploaded`; mutated only by the transcode worker afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Surrogate primary key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,

    /// Stable video identifier (filename minus extension).
    pub video_id: VideoId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_id: Option<String>,

    #[serde(default)]
    pub status: VideoStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a new record in the initial `uploaded` state.
    pub fn new(video_id: VideoId) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            video_id,
            title: None,
            description: None,
            uploader_id: None,
            status: VideoStatus::Uploaded,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_uploader(mut self, uploader_id: impl Into<String>) -> Self {
        self.uploader_id = Some(uploader_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_id_from_filename_strips_extension() {
        assert_eq!(VideoId::from_filename("clip1.mp4").as_str(), "clip1");
        assert_eq!(VideoId::from_filename("movie.final.mkv").as_str(), "movie.final");
        assert_eq!(VideoId::from_filename("noext").as_str(), "noext");
        // A leading-dot name has an empty stem; keep the whole name.
        assert_eq!(VideoId::from_filename(".hidden").as_str(), ".hidden");
    }

    #[test]
    fn status_transitions_are_monotone() {
        assert!(VideoStatus::Uploaded.can_transition_to(VideoStatus::Transcoding));
        assert!(VideoStatus::Transcoding.can_transition_to(VideoStatus::Ready));
        assert!(VideoStatus::Transcoding.can_transition_to(VideoStatus::Failed));
        assert!(VideoStatus::Failed.can_transition_to(VideoStatus::Transcoding));

        assert!(!VideoStatus::Uploaded.can_transition_to(VideoStatus::Ready));
        assert!(!VideoStatus::Ready.can_transition_to(VideoStatus::Transcoding));
        assert!(!VideoStatus::Ready.can_transition_to(VideoStatus::Failed));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&VideoStatus::Transcoding).unwrap(),
            "\"transcoding\""
        );
        let parsed: VideoStatus = serde_json::from_str("\"ready\"").unwrap();
        assert_eq!(parsed, VideoStatus::Ready);
    }

    #[test]
    fn new_record_starts_uploaded() {
        let rec = VideoRecord::new(VideoId::from("clip1")).with_title("Clip 1");
        assert_eq!(rec.status, VideoStatus::Uploaded);
        assert_eq!(rec.title.as_deref(), Some("Clip 1"));
        assert!(rec.id.is_none());
    }
}

//! Transcode job queue payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::video::VideoId;

/// Reasons a job payload fails validation.
///
/// A payload that fails validation can never become valid, so the message
/// is rejected without requeue and the status store is left untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobValidationError {
    #[error("bucket must be a non-empty string")]
    EmptyBucket,

    #[error("filename must be a non-empty string")]
    EmptyFilename,
}

/// A transcode job as published on the work queue.
///
/// Wire format (JSON): `{ "bucket": ..., "filename": ..., "timestamp": ... }`.
/// Unknown fields are ignored; `timestamp` is advisory only. The job is
/// never persisted, it exists only between publish and ack/reject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeJob {
    /// Object-store bucket holding the source upload.
    pub bucket: String,
    /// Source object key, extension included.
    pub filename: String,
    /// Publish time, advisory only.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TranscodeJob {
    /// Create a job stamped with the current time.
    pub fn new(bucket: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            filename: filename.into(),
            timestamp: Some(Utc::now()),
        }
    }

    /// Check the minimal payload shape: both strings non-empty.
    pub fn validate(&self) -> Result<(), JobValidationError> {
        if self.bucket.trim().is_empty() {
            return Err(JobValidationError::EmptyBucket);
        }
        if self.filename.trim().is_empty() {
            return Err(JobValidationError::EmptyFilename);
        }
        Ok(())
    }

    /// Derive the video identifier from the source filename.
    pub fn video_id(&self) -> VideoId {
        VideoId::from_filename(&self.filename)
    }
}

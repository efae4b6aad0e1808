//! Shared data models for the vodpress pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video records and status lifecycle
//! - Transcode job queue payloads
//! - The fixed rendition ladder and object key scheme

pub mod job;
pub mod rendition;
pub mod video;

pub use job::{JobValidationError, TranscodeJob};
pub use rendition::{
    master_playlist_key, segment_key, variant_playlist_key, variant_prefix, Rendition, RENDITIONS,
    SEGMENT_DURATION_SECS,
};
pub use video::{VideoId, VideoRecord, VideoStatus};

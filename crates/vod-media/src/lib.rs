//! FFmpeg CLI wrapper for rendition encoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building for multi-output filter graphs
//! - The `MediaEncoder` capability trait
//! - The production adapter shelling out to the `ffmpeg` binary

pub mod command;
pub mod encoder;
pub mod error;

pub use command::{FfmpegCommand, FfmpegRunner, OutputSpec};
pub use encoder::{build_ladder_command, FfmpegEncoder, MediaEncoder};
pub use error::{MediaError, MediaResult};

//! HLS playlist synthesis.
//!
//! This crate provides:
//! - Pure builders for variant and master playlist bodies
//! - The manifest generator that lists uploaded segments, signs every URL,
//!   and uploads both playlist tiers

pub mod generator;
pub mod playlist;

pub use generator::{HlsError, HlsResult, ManifestGenerator};
pub use playlist::{build_master_playlist, build_variant_playlist, MasterEntry, PLAYLIST_CONTENT_TYPE};

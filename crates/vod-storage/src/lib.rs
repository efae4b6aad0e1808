//! Object store access for the vodpress pipeline.
//!
//! This crate provides:
//! - The `ContentStore` capability trait (put/get/head/list)
//! - The S3-compatible adapter used in production (path-style, custom
//!   internal endpoint)
//! - An in-memory store for tests
//! - Signed URL generation with public-origin rewriting

pub mod client;
pub mod error;
pub mod memory;
pub mod signing;
pub mod store;

pub use client::{ObjectStoreClient, ObjectStoreConfig};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryContentStore;
pub use signing::{rewrite_origin, PresignedUrlSigner, UrlSigner, MANIFEST_URL_TTL, SEGMENT_URL_TTL};
pub use store::ContentStore;

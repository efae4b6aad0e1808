//! Persisted video status records.
//!
//! This crate provides:
//! - The `StatusStore` capability trait
//! - The Postgres adapter used in production
//! - An in-memory store for tests

pub mod error;
pub mod memory;
pub mod status_store;

pub use error::{DbError, DbResult};
pub use memory::MemoryStatusStore;
pub use status_store::{PgStatusStore, StatusStore};

//! Transcode pipeline worker.
//!
//! This crate provides:
//! - The per-job pipeline (validate, transcode, upload, manifest, status)
//! - The executor that drives it from the durable job stream

pub mod config;
pub mod error;
pub mod executor;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use processor::{process_delivery, JobOutcome, ProcessingContext};

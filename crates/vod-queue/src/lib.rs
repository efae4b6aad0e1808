//! Durable transcode job queue over Redis Streams.
//!
//! This crate provides:
//! - Job publishing (XADD to a durable stream)
//! - Consumer-group consumption with explicit acknowledgment
//! - Reject-without-requeue with a configurable drop/dead-letter policy

pub mod error;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use queue::{Delivery, QueueConfig, RejectPolicy, TranscodeQueue};

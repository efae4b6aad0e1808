//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Work directory for temporary files
    pub work_dir: String,
    /// How long a single consume call blocks waiting for a message
    pub consume_block: Duration,
    /// Back-off after a queue consume error
    pub error_backoff: Duration,
    /// How often to scan the pending list for orphaned deliveries
    pub claim_interval: Duration,
    /// Minimum idle time before a pending delivery can be claimed
    /// (crash recovery)
    pub claim_min_idle: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/vodpress".to_string(),
            consume_block: Duration::from_secs(1),
            error_backoff: Duration::from_secs(5),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(300),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or(defaults.work_dir),
            consume_block: Duration::from_millis(
                std::env::var("WORKER_CONSUME_BLOCK_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            error_backoff: Duration::from_secs(
                std::env::var("WORKER_ERROR_BACKOFF_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            claim_min_idle: Duration::from_secs(
                std::env::var("WORKER_CLAIM_MIN_IDLE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        }
    }
}

//! Job executor.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vod_queue::{Delivery, TranscodeQueue};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::processor::{process_delivery, JobOutcome, ProcessingContext};

/// Pulls messages off the stream and runs them through the pipeline, one
/// at a time. Prefetch stays at one so a crashed worker leaves at most one
/// delivery in the group's pending list, which the periodic claim pass
/// transfers to a live consumer.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<TranscodeQueue>,
    ctx: Arc<ProcessingContext>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, queue: TranscodeQueue, ctx: ProcessingContext) -> Self {
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            ctx: Arc::new(ctx),
            shutdown,
            consumer_name,
        }
    }

    /// Run the consume loop until shutdown is signalled.
    ///
    /// The shutdown flag is consulted only between messages, never while one
    /// is in flight: a claimed message always runs to its ack/reject before
    /// the loop exits, so a graceful stop cannot abandon a job. Worst-case
    /// exit latency is one consume block plus one full job.
    pub async fn run(&self) -> WorkerResult<()> {
        info!("Starting job executor '{}'", self.consumer_name);

        self.queue.init().await?;

        let shutdown_rx = self.shutdown.subscribe();
        let mut last_claim = Instant::now();

        while !*shutdown_rx.borrow() {
            if last_claim.elapsed() >= self.config.claim_interval {
                last_claim = Instant::now();
                if let Err(e) = self.claim_stale().await {
                    warn!("Failed to claim stale messages: {}", e);
                }
            }

            if let Err(e) = self.consume_one().await {
                error!("Error consuming jobs: {}", e);
                tokio::time::sleep(self.config.error_backoff).await;
            }
        }

        info!("Shutdown signal received, job executor stopped");
        Ok(())
    }

    /// Claim and fully process at most one new message.
    async fn consume_one(&self) -> WorkerResult<()> {
        let deliveries = self
            .queue
            .consume(
                &self.consumer_name,
                self.config.consume_block.as_millis() as u64,
                1,
            )
            .await?;

        for delivery in deliveries {
            self.handle(delivery).await?;
        }

        Ok(())
    }

    /// Take over deliveries a dead consumer left pending past the idle
    /// threshold and run them through the pipeline.
    async fn claim_stale(&self) -> WorkerResult<()> {
        let deliveries = self
            .queue
            .claim_pending(
                &self.consumer_name,
                self.config.claim_min_idle.as_millis() as u64,
                10,
            )
            .await?;

        for delivery in deliveries {
            self.handle(delivery).await?;
        }

        Ok(())
    }

    async fn handle(&self, delivery: Delivery) -> WorkerResult<()> {
        debug!("Claimed message {}", delivery.message_id);

        match process_delivery(&self.ctx, &delivery.payload).await {
            JobOutcome::Ack => self.queue.ack(&delivery.message_id).await?,
            JobOutcome::Reject(reason) => self.queue.reject(&delivery, &reason).await?,
        }

        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;
    use url::Url;

    use vod_db::MemoryStatusStore;
    use vod_hls::ManifestGenerator;
    use vod_media::{MediaEncoder, MediaResult};
    use vod_models::{TranscodeJob, VideoId, VideoRecord, VideoStatus, RENDITIONS};
    use vod_storage::{ContentStore, MemoryContentStore, StorageResult, UrlSigner};

    struct FakeSigner;

    #[async_trait]
    impl UrlSigner for FakeSigner {
        async fn sign(&self, bucket: &str, key: &str, _ttl: Duration) -> StorageResult<Url> {
            Ok(Url::parse(&format!(
                "https://cdn.example.com/play/{}/{}?X-Amz-Signature=test",
                bucket, key
            ))
            .unwrap())
        }
    }

    /// Yields mid-encode, giving a concurrently fired signal every chance
    /// to interleave before the segments are written.
    struct SlowEncoder;

    #[async_trait]
    impl MediaEncoder for SlowEncoder {
        async fn encode(&self, _input: &Path, output_dir: &Path) -> MediaResult<()> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            for r in &RENDITIONS {
                let dir = output_dir.join(r.name);
                tokio::fs::create_dir_all(&dir).await?;
                tokio::fs::write(dir.join("segment_000.ts"), b"seg").await?;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn in_flight_job_completes_despite_shutdown_signal() {
        // The run loop consults the shutdown flag only between messages;
        // the processing future itself must never be dropped mid-pipeline.
        let store = Arc::new(MemoryContentStore::new());
        let status = Arc::new(MemoryStatusStore::new());
        let work_dir = TempDir::new().unwrap();

        status.insert(VideoRecord::new(VideoId::from("clip1")));
        store
            .put("video-uploads", "clip1.mp4", b"source".to_vec(), "video/mp4")
            .await
            .unwrap();

        let ctx = Arc::new(ProcessingContext {
            store: store.clone(),
            status: status.clone(),
            encoder: Arc::new(SlowEncoder),
            manifests: ManifestGenerator::new(store.clone(), Arc::new(FakeSigner)),
            work_dir: work_dir.path().to_path_buf(),
        });

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let payload =
            serde_json::to_vec(&TranscodeJob::new("video-uploads", "clip1.mp4")).unwrap();

        let worker_ctx = Arc::clone(&ctx);
        let in_flight =
            tokio::spawn(async move { process_delivery(&worker_ctx, &payload).await });

        // Signal while the encode is still sleeping.
        shutdown_tx.send(true).unwrap();

        let outcome = in_flight.await.unwrap();
        assert_eq!(outcome, JobOutcome::Ack);
        assert_eq!(status.status_of("clip1"), Some(VideoStatus::Ready));
        assert!(*shutdown_rx.borrow());
    }
}

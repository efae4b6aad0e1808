//! Transcode job queue using Redis Streams.
//!
//! The stream plus a consumer group gives durable, at-least-once delivery
//! with explicit acknowledgment. Consuming with `COUNT 1` is the prefetch=1
//! contract: one unacknowledged message per worker, strictly sequential
//! processing, while multiple worker processes pull from the same group for
//! horizontal scaling.

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use vod_models::TranscodeJob;

use crate::error::{QueueError, QueueResult};

/// What `reject` does with a message that will not be retried.
///
/// The pipeline never requeues on its own; `Drop` is the original
/// at-most-one-attempt behavior. `DeadLetter` keeps a copy on a separate
/// stream for operator-triggered redrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectPolicy {
    /// Acknowledge and discard the message.
    #[default]
    Drop,
    /// Copy the message to the dead-letter stream, then acknowledge.
    DeadLetter,
}

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for transcode jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Dead letter stream name
    pub dlq_stream_name: String,
    /// Reject handling
    pub reject_policy: RejectPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "vodpress:transcode".to_string(),
            consumer_group: "vodpress:workers".to_string(),
            dlq_stream_name: "vodpress:dlq".to_string(),
            reject_policy: RejectPolicy::Drop,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or(defaults.consumer_group),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream_name),
            reject_policy: match std::env::var("QUEUE_REJECT_POLICY").as_deref() {
                Ok("dead_letter") => RejectPolicy::DeadLetter,
                _ => RejectPolicy::Drop,
            },
        }
    }
}

/// One claimed message. The payload is handed over raw so payload
/// validation (and its failure semantics) stays with the orchestrator.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Stream entry ID, used for ack/reject.
    pub message_id: String,
    /// Raw JSON job payload.
    pub payload: Vec<u8>,
}

/// Transcode job queue client.
pub struct TranscodeQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl TranscodeQueue {
    /// Create a new queue client.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Publish a transcode job to the durable stream.
    pub async fn publish(&self, job: &TranscodeJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(job)?;

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        info!(
            "Published transcode job for {} with message ID {}",
            job.filename, message_id
        );

        Ok(message_id)
    }

    /// Consume messages from the queue.
    ///
    /// `count` is the prefetch limit; the worker passes 1 so at most one
    /// message is unacknowledged per consumer at a time.
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut deliveries = Vec::new();

        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();

                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    debug!("Consumed message {}", message_id);
                    deliveries.push(Delivery {
                        message_id,
                        payload: payload.clone(),
                    });
                } else {
                    // No job field at all: nothing the orchestrator could
                    // even validate. Drop it here.
                    warn!("Message {} has no job payload, discarding", message_id);
                    self.ack(&message_id).await.ok();
                }
            }
        }

        Ok(deliveries)
    }

    /// Claim messages another consumer has left pending for at least
    /// `min_idle_ms`.
    ///
    /// Crash recovery: a worker that dies mid-job leaves its delivery in the
    /// group's pending list, where a plain `>` read never sees it again.
    /// XAUTOCLAIM transfers such entries to this consumer, keeping
    /// at-least-once delivery across worker restarts.
    pub async fn claim_pending(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let reply: redis::streams::StreamAutoClaimReply = redis::cmd("XAUTOCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms)
            .arg("0-0")
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut deliveries = Vec::new();

        for entry in reply.claimed {
            let message_id = entry.id.clone();

            if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                deliveries.push(Delivery {
                    message_id,
                    payload: payload.clone(),
                });
            } else {
                warn!(
                    "Claimed message {} has no job payload, discarding",
                    message_id
                );
                self.ack(&message_id).await.ok();
            }
        }

        if !deliveries.is_empty() {
            info!("Claimed {} pending messages", deliveries.len());
        }

        Ok(deliveries)
    }

    /// Acknowledge a message (job finished, terminal status written).
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged message: {}", message_id);
        Ok(())
    }

    /// Reject a message without requeue.
    ///
    /// Under `Drop` the message is simply acknowledged and discarded; under
    /// `DeadLetter` a copy lands on the DLQ stream first. Either way the
    /// message is never redelivered by this system.
    pub async fn reject(&self, delivery: &Delivery, reason: &str) -> QueueResult<()> {
        if self.config.reject_policy == RejectPolicy::DeadLetter {
            let mut conn = self.client.get_multiplexed_async_connection().await?;

            redis::cmd("XADD")
                .arg(&self.config.dlq_stream_name)
                .arg("*")
                .arg("job")
                .arg(&delivery.payload)
                .arg("error")
                .arg(reason)
                .arg("original_id")
                .arg(&delivery.message_id)
                .query_async::<()>(&mut conn)
                .await?;

            warn!(
                "Moved message {} to DLQ: {}",
                delivery.message_id, reason
            );
        } else {
            warn!("Dropped message {}: {}", delivery.message_id, reason);
        }

        self.ack(&delivery.message_id).await
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    /// Get DLQ length.
    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_drop() {
        let config = QueueConfig::default();
        assert_eq!(config.reject_policy, RejectPolicy::Drop);
        assert_eq!(config.stream_name, "vodpress:transcode");
    }

    #[test]
    fn job_payload_round_trips_through_wire_format() {
        let job = TranscodeJob::new("video-uploads", "clip1.mp4");
        let payload = serde_json::to_vec(&job).unwrap();
        let parsed: TranscodeJob = serde_json::from_slice(&payload).unwrap();
        assert_eq!(parsed.bucket, "video-uploads");
        assert_eq!(parsed.video_id().as_str(), "clip1");
    }
}

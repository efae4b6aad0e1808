//! The per-job pipeline.
//!
//! One claimed message runs the full pipeline sequentially: validate the
//! payload, mark the video `transcoding`, download the source, encode the
//! ladder, upload segments, regenerate manifests, and mark the terminal
//! status. The outcome tells the executor whether to ack or reject; rejected
//! messages are never requeued.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use vod_db::StatusStore;
use vod_hls::ManifestGenerator;
use vod_media::MediaEncoder;
use vod_models::{variant_prefix, TranscodeJob, VideoId, VideoStatus, RENDITIONS};
use vod_storage::ContentStore;

use crate::error::WorkerResult;

/// Content type for uploaded MPEG-TS segments.
const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";

/// What the executor should do with the claimed message.
#[derive(Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// Terminal status written, drop the message.
    Ack,
    /// The job cannot succeed; discard without requeue.
    Reject(String),
}

/// Everything one job needs, behind capability traits so tests run the
/// whole pipeline against in-memory adapters.
pub struct ProcessingContext {
    pub store: Arc<dyn ContentStore>,
    pub status: Arc<dyn StatusStore>,
    pub encoder: Arc<dyn MediaEncoder>,
    pub manifests: ManifestGenerator,
    pub work_dir: PathBuf,
}

/// Run one claimed message through the pipeline.
///
/// The payload arrives raw: a payload that does not parse or validate can
/// never become valid, so it is rejected before any status write. Once the
/// job is known valid, every later failure lands the video in `failed`
/// before the message is rejected.
pub async fn process_delivery(ctx: &ProcessingContext, payload: &[u8]) -> JobOutcome {
    let job: TranscodeJob = match serde_json::from_slice(payload) {
        Ok(job) => job,
        Err(e) => return JobOutcome::Reject(format!("malformed job payload: {}", e)),
    };
    if let Err(e) = job.validate() {
        return JobOutcome::Reject(format!("invalid job payload: {}", e));
    }

    let video_id = job.video_id();
    info!("Processing transcode job for video {}", video_id);

    if let Err(e) = ctx
        .status
        .update_status(&video_id, VideoStatus::Transcoding)
        .await
    {
        // No record to carry a terminal status; nothing to mark failed.
        return JobOutcome::Reject(format!("cannot mark video {} transcoding: {}", video_id, e));
    }

    let job_dir = ctx
        .work_dir
        .join(format!("{}-{}", video_id, Uuid::new_v4()));

    let result = run_pipeline(ctx, &job, &video_id, &job_dir).await;

    if let Err(e) = tokio::fs::remove_dir_all(&job_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to clean up {}: {}", job_dir.display(), e);
        }
    }

    match result {
        Ok(()) => {
            info!("Video {} is ready", video_id);
            JobOutcome::Ack
        }
        Err(e) => {
            error!("Transcode failed for video {}: {}", video_id, e);
            if let Err(db_err) = ctx.status.update_status(&video_id, VideoStatus::Failed).await {
                error!("Failed to mark video {} failed: {}", video_id, db_err);
            }
            JobOutcome::Reject(e.to_string())
        }
    }
}

async fn run_pipeline(
    ctx: &ProcessingContext,
    job: &TranscodeJob,
    video_id: &VideoId,
    job_dir: &Path,
) -> WorkerResult<()> {
    let source = job_dir.join("source").join(&job.filename);
    ctx.store
        .download_to_file(&job.bucket, &job.filename, &source)
        .await?;

    let encoded_dir = job_dir.join("encoded");
    tokio::fs::create_dir_all(&encoded_dir).await?;
    ctx.encoder.encode(&source, &encoded_dir).await?;

    upload_segments(ctx, &job.bucket, video_id, &encoded_dir).await?;

    ctx.manifests
        .generate_and_upload(&job.bucket, video_id)
        .await?;

    ctx.status.update_status(video_id, VideoStatus::Ready).await?;
    Ok(())
}

/// Upload every encoded segment under its rendition prefix, keeping the
/// encoder's zero-padded names so listing order equals temporal order.
async fn upload_segments(
    ctx: &ProcessingContext,
    bucket: &str,
    video_id: &VideoId,
    encoded_dir: &Path,
) -> WorkerResult<()> {
    let mut total = 0usize;

    for rendition in &RENDITIONS {
        let dir = encoded_dir.join(rendition.name);
        let mut names = Vec::new();

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No output directory for rendition {}", rendition.name);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".ts") {
                names.push(name);
            }
        }
        names.sort();

        let prefix = variant_prefix(video_id.as_str(), rendition.name);
        for name in &names {
            let key = format!("{}{}", prefix, name);
            ctx.store
                .upload_file(bucket, &key, &dir.join(name), SEGMENT_CONTENT_TYPE)
                .await?;
        }

        total += names.len();
    }

    info!("Uploaded {} segments for video {}", total, video_id);
    Ok(())
}

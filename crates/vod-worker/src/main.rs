//! Transcode worker binary.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vod_db::PgStatusStore;
use vod_hls::ManifestGenerator;
use vod_media::FfmpegEncoder;
use vod_queue::TranscodeQueue;
use vod_storage::{ContentStore, ObjectStoreClient, PresignedUrlSigner};
use vod_worker::{JobExecutor, ProcessingContext, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn,aws_config=warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vod-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let queue = match TranscodeQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    let status = match PgStatusStore::from_env().await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to connect to status database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = status.migrate().await {
        error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    let client = ObjectStoreClient::from_env();
    let signer = match PresignedUrlSigner::new(client.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create URL signer: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn ContentStore> = Arc::new(client);
    let ctx = ProcessingContext {
        store: Arc::clone(&store),
        status: Arc::new(status),
        encoder: Arc::new(FfmpegEncoder::new()),
        manifests: ManifestGenerator::new(store, Arc::new(signer)),
        work_dir: PathBuf::from(&config.work_dir),
    };

    let executor = Arc::new(JobExecutor::new(config, queue, ctx));

    let shutdown_exec = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_exec.shutdown();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

//! Axum gateway binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vod_api::{create_router, ApiConfig, AppState, PlaybackService, RedisResponseCache};
use vod_db::{PgStatusStore, StatusStore};
use vod_storage::{ContentStore, ObjectStoreClient, PresignedUrlSigner};

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

    info!("Starting vod-api");

    let config = ApiConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

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

    let cache = match RedisResponseCache::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create response cache: {}", e);
            std::process::exit(1);
        }
    };

    let status: Arc<dyn StatusStore> = Arc::new(status);
    let store: Arc<dyn ContentStore> = Arc::new(client);
    let playback = PlaybackService::new(
        Arc::clone(&status),
        store,
        Arc::new(signer),
        Arc::new(cache),
        config.upload_bucket.clone(),
    );

    let state = AppState {
        config: config.clone(),
        status,
        playback: Arc::new(playback),
    };

    let app = create_router(state);

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address: {}", e);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Received shutdown signal");
}

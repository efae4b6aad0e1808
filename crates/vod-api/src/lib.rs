//! Playback gateway.
//!
//! Thin axum layer over the playback resolver: manifest resolution with a
//! short-TTL response cache, video listing, and a health probe.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod playback;
pub mod routes;
pub mod state;

pub use cache::{manifest_cache_key, MemoryResponseCache, RedisResponseCache, ResponseCache,
    PLAYBACK_CACHE_TTL};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use playback::{PlaybackResponse, PlaybackService};
pub use routes::create_router;
pub use state::AppState;

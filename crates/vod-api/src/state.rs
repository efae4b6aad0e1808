//! Application state.

use std::sync::Arc;

use vod_db::StatusStore;

use crate::config::ApiConfig;
use crate::playback::PlaybackService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub status: Arc<dyn StatusStore>,
    pub playback: Arc<PlaybackService>,
}

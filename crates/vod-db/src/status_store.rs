//! Status store trait and Postgres adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};

use vod_models::{VideoId, VideoRecord, VideoStatus};

use crate::error::{DbError, DbResult};

/// Narrow interface over persisted video metadata.
///
/// The orchestrator only reads and writes status by video_id; `create` and
/// `list_videos` exist for the ingestion collaborator and the gateway.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Insert a new record (ingestion side, status `uploaded`).
    async fn create(&self, record: &VideoRecord) -> DbResult<VideoRecord>;

    /// Set the status of an existing record and bump `updated_at`.
    async fn update_status(&self, video_id: &VideoId, status: VideoStatus) -> DbResult<()>;

    /// Look up a record; `None` when the video is unknown.
    async fn get_by_video_id(&self, video_id: &VideoId) -> DbResult<Option<VideoRecord>>;

    /// Newest-first listing page.
    async fn list_videos(&self, limit: i64, offset: i64) -> DbResult<Vec<VideoRecord>>;
}

#[derive(sqlx::FromRow)]
struct VideoRow {
    id: i32,
    video_id: String,
    title: Option<String>,
    description: Option<String>,
    uploader_id: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VideoRow {
    fn into_record(self) -> DbResult<VideoRecord> {
        let status = self
            .status
            .parse::<VideoStatus>()
            .map_err(|e| DbError::ConnectionFailed(format!("corrupt status column: {}", e)))?;
        Ok(VideoRecord {
            id: Some(self.id),
            video_id: VideoId::from(self.video_id),
            title: self.title,
            description: self.description,
            uploader_id: self.uploader_id,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str =
    "id, video_id, title, description, uploader_id, status, created_at, updated_at";

/// Postgres-backed status store.
#[derive(Clone)]
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using `DATABASE_URL`.
    pub async fn from_env() -> DbResult<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DbError::connection_failed("DATABASE_URL not set"))?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> DbResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    #[tracing::instrument(skip(self, record), fields(db.table = "videos", db.operation = "insert"))]
    async fn create(&self, record: &VideoRecord) -> DbResult<VideoRecord> {
        let row = sqlx::query_as::<Postgres, VideoRow>(&format!(
            "INSERT INTO videos (video_id, title, description, uploader_id, status)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            SELECT_COLUMNS
        ))
        .bind(record.video_id.as_str())
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.uploader_id)
        .bind(record.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DbError::Duplicate(record.video_id.to_string())
            }
            _ => DbError::Sqlx(e),
        })?;

        row.into_record()
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "update"))]
    async fn update_status(&self, video_id: &VideoId, status: VideoStatus) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE videos SET status = $1, updated_at = now() WHERE video_id = $2",
        )
        .bind(status.as_str())
        .bind(video_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(video_id.to_string()));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select"))]
    async fn get_by_video_id(&self, video_id: &VideoId) -> DbResult<Option<VideoRecord>> {
        let row = sqlx::query_as::<Postgres, VideoRow>(&format!(
            "SELECT {} FROM videos WHERE video_id = $1 LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(video_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(VideoRow::into_record).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select"))]
    async fn list_videos(&self, limit: i64, offset: i64) -> DbResult<Vec<VideoRecord>> {
        let rows = sqlx::query_as::<Postgres, VideoRow>(&format!(
            "SELECT {} FROM videos ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            SELECT_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(VideoRow::into_record).collect()
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::db::Db;
use crate::models::{ProgressMap, ProgressRecord, VideoId};

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Durable home for progress records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn load_progress(&self) -> Result<ProgressMap, RepoError>;
    async fn persist_progress(&self, video_id: VideoId, record: &ProgressRecord) -> Result<(), RepoError>;
}

/// Keeps records for the life of the process only.
#[derive(Default)]
pub struct MemoryProgressRepository {
    records: Mutex<ProgressMap>,
}

impl MemoryProgressRepository {
    pub fn with_records(records: ProgressMap) -> Self {
        Self { records: Mutex::new(records) }
    }

    pub async fn stored(&self, video_id: VideoId) -> Option<ProgressRecord> {
        self.records.lock().await.get(&video_id).cloned()
    }
}

#[async_trait]
impl ProgressRepository for MemoryProgressRepository {
    async fn load_progress(&self) -> Result<ProgressMap, RepoError> {
        Ok(self.records.lock().await.clone())
    }

    async fn persist_progress(&self, video_id: VideoId, record: &ProgressRecord) -> Result<(), RepoError> {
        self.records.lock().await.insert(video_id, record.clone());
        Ok(())
    }
}

/// Whole map serialized as one JSON object keyed by video id.
pub struct JsonFileProgressRepository {
    path: PathBuf,
    cache: Mutex<Option<ProgressMap>>,
}

impl JsonFileProgressRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), cache: Mutex::new(None) }
    }

    async fn read_file(&self) -> Result<ProgressMap, RepoError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProgressMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(&self, map: &ProgressMap) -> Result<(), RepoError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(map)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for JsonFileProgressRepository {
    async fn load_progress(&self) -> Result<ProgressMap, RepoError> {
        let mut cache = self.cache.lock().await;
        let map = self.read_file().await?;
        *cache = Some(map.clone());
        Ok(map)
    }

    async fn persist_progress(&self, video_id: VideoId, record: &ProgressRecord) -> Result<(), RepoError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.read_file().await?);
        }
        let map = cache.get_or_insert_with(ProgressMap::new);
        map.insert(video_id, record.clone());
        self.write_file(map).await
    }
}

#[derive(sqlx::FromRow, Debug)]
struct ProgressRow {
    video_id: i64,
    watched_seconds: f64,
    completed: bool,
    last_watched: Option<DateTime<Utc>>,
    bookmarks: Vec<f64>,
}

impl From<ProgressRow> for ProgressRecord {
    fn from(r: ProgressRow) -> Self {
        ProgressRecord {
            video_id: r.video_id,
            watched_seconds: r.watched_seconds,
            completed: r.completed,
            last_watched: r.last_watched,
            bookmarks: r.bookmarks,
        }
    }
}

pub struct PgProgressRepository {
    db: Db,
}

impl PgProgressRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgressRepository for PgProgressRepository {
    async fn load_progress(&self) -> Result<ProgressMap, RepoError> {
        let rows: Vec<ProgressRow> = sqlx::query_as(
            "SELECT video_id, watched_seconds, completed, last_watched, bookmarks FROM video_progress",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.video_id, ProgressRecord::from(r)))
            .collect())
    }

    async fn persist_progress(&self, video_id: VideoId, record: &ProgressRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO video_progress (video_id, watched_seconds, completed, last_watched, bookmarks)
            VALUES ($1,$2,$3,$4,$5)
            ON CONFLICT (video_id)
            DO UPDATE SET watched_seconds=EXCLUDED.watched_seconds,
                          completed=EXCLUDED.completed,
                          last_watched=EXCLUDED.last_watched,
                          bookmarks=EXCLUDED.bookmarks,
                          updated_at=now()
            "#,
        )
        .bind(video_id)
        .bind(record.watched_seconds)
        .bind(record.completed)
        .bind(record.last_watched)
        .bind(record.bookmarks.clone())
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

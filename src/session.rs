//! One learner's session: the catalog, the progress store and where progress
//! gets persisted, wired together and handed to the HTTP layer as shared state.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{Catalog, CatalogSource};
use crate::error::CoreError;
use crate::models::{BookmarkAction, PlaybackOutcome, ProgressMap, ProgressRecord, VideoId};
use crate::progress::{Clock, ProgressStore};
use crate::repository::ProgressRepository;

pub struct LearningSession {
    catalog: RwLock<Option<Arc<Catalog>>>,
    source: Arc<dyn CatalogSource>,
    store: RwLock<ProgressStore>,
    repo: Arc<dyn ProgressRepository>,
    clock: Arc<dyn Clock>,
}

impl LearningSession {
    /// Hydrates progress from `repo`, then attempts a first catalog load.
    /// A failed catalog load leaves the session usable and retryable.
    pub async fn start(
        source: Arc<dyn CatalogSource>,
        repo: Arc<dyn ProgressRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (catalog, progress) = tokio::join!(Catalog::load(source.as_ref()), repo.load_progress());

        let progress = progress.unwrap_or_else(|e| {
            tracing::error!(error = %e, "progress load failed, starting empty");
            ProgressMap::new()
        });
        let catalog = match catalog {
            Ok(c) => Some(Arc::new(c)),
            Err(e) => {
                tracing::error!(error = %e, "catalog load failed, retry via reload");
                None
            }
        };

        Self {
            catalog: RwLock::new(catalog),
            source,
            store: RwLock::new(ProgressStore::new(progress, clock.clone())),
            repo,
            clock,
        }
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub async fn catalog(&self) -> Result<Arc<Catalog>, CoreError> {
        self.catalog
            .read()
            .await
            .clone()
            .ok_or_else(|| CoreError::LoadFailure("catalog".into()))
    }

    /// Retries the catalog load. The current catalog is replaced only on success.
    pub async fn reload_catalog(&self) -> Result<Arc<Catalog>, CoreError> {
        let fresh = Arc::new(Catalog::load(self.source.as_ref()).await?);
        *self.catalog.write().await = Some(fresh.clone());
        Ok(fresh)
    }

    pub async fn progress(&self) -> ProgressMap {
        self.store.read().await.snapshot()
    }

    pub async fn progress_for(&self, video_id: VideoId) -> ProgressRecord {
        self.store.read().await.get_or_default(video_id)
    }

    /// Applies a playback report. Unknown videos are recorded with no duration,
    /// so they only complete when told to.
    pub async fn record_playback(
        &self,
        video_id: VideoId,
        watched_seconds: f64,
        explicit_complete: bool,
    ) -> PlaybackOutcome {
        let duration = match self.catalog().await.and_then(|c| c.video(video_id).map(|v| v.duration)) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(video_id, error = %e, "recording playback without a duration");
                0.0
            }
        };

        // persist under the write lock so the repository sees updates in store order
        let mut store = self.store.write().await;
        let was_completed = store.get_or_default(video_id).completed;
        let record = store.update(video_id, watched_seconds, duration, explicit_complete);
        let newly_completed = !was_completed && record.completed;
        if newly_completed {
            tracing::info!(video_id, "video completed");
        }
        self.persist(video_id, &record).await;
        drop(store);

        PlaybackOutcome { record, newly_completed }
    }

    pub async fn toggle_bookmark(
        &self,
        video_id: VideoId,
        timestamp: f64,
        action: BookmarkAction,
    ) -> ProgressRecord {
        let mut store = self.store.write().await;
        let record = match action {
            BookmarkAction::Add => store.add_bookmark(video_id, timestamp),
            BookmarkAction::Remove => store.remove_bookmark(video_id, timestamp),
        };
        // removing from a record that never existed leaves nothing to persist
        if store.get().contains_key(&video_id) {
            self.persist(video_id, &record).await;
        }
        drop(store);
        record
    }

    // failures are logged, the in-memory state stays authoritative
    async fn persist(&self, video_id: VideoId, record: &ProgressRecord) {
        if let Err(e) = self.repo.persist_progress(video_id, record).await {
            tracing::warn!(video_id, error = %e, "progress persist failed");
        }
    }
}

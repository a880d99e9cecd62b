use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::error::CoreError;
use crate::models::{Category, Module, Video, VideoId};
use crate::ordering;

/// Read-only provider of catalog collections. Failures are retryable.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load_videos(&self) -> Result<Vec<Video>, CoreError>;
    async fn load_modules(&self) -> Result<Vec<Module>, CoreError>;
    async fn load_categories(&self) -> Result<Vec<Category>, CoreError>;
}

/// Reads `videos.json`, `modules.json` and `categories.json` from a directory.
pub struct FileCatalogSource {
    dir: PathBuf,
}

impl FileCatalogSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, CoreError> {
        let path = self.dir.join(name);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "catalog read failed");
            CoreError::LoadFailure(name.to_string())
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "catalog decode failed");
            CoreError::LoadFailure(name.to_string())
        })
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn load_videos(&self) -> Result<Vec<Video>, CoreError> {
        self.read("videos.json").await
    }
    async fn load_modules(&self) -> Result<Vec<Module>, CoreError> {
        self.read("modules.json").await
    }
    async fn load_categories(&self) -> Result<Vec<Category>, CoreError> {
        self.read("categories.json").await
    }
}

/// Fetches the same three documents from `<base_url>/<name>.json`.
pub struct HttpCatalogSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, CoreError> {
        let url = format!("{}/{}", self.base_url, name);
        let fail = |e: reqwest::Error| {
            tracing::error!(url = %url, error = %e, "catalog fetch failed");
            CoreError::LoadFailure(name.to_string())
        };
        self.client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fail)?
            .json::<Vec<T>>()
            .await
            .map_err(fail)
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn load_videos(&self) -> Result<Vec<Video>, CoreError> {
        self.fetch("videos.json").await
    }
    async fn load_modules(&self) -> Result<Vec<Module>, CoreError> {
        self.fetch("modules.json").await
    }
    async fn load_categories(&self) -> Result<Vec<Category>, CoreError> {
        self.fetch("categories.json").await
    }
}

/// Fixed collections, used for embedding and tests.
#[derive(Default, Clone)]
pub struct InMemoryCatalogSource {
    pub videos: Vec<Video>,
    pub modules: Vec<Module>,
    pub categories: Vec<Category>,
}

#[async_trait]
impl CatalogSource for InMemoryCatalogSource {
    async fn load_videos(&self) -> Result<Vec<Video>, CoreError> {
        Ok(self.videos.clone())
    }
    async fn load_modules(&self) -> Result<Vec<Module>, CoreError> {
        Ok(self.modules.clone())
    }
    async fn load_categories(&self) -> Result<Vec<Category>, CoreError> {
        Ok(self.categories.clone())
    }
}

/// Validated, immutable catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    videos: Vec<Video>,
    modules: Vec<Module>,
    categories: Vec<Category>,
    video_index: HashMap<VideoId, usize>,
}

impl Catalog {
    /// Loads all three collections concurrently; any failure fails the whole load.
    pub async fn load(source: &dyn CatalogSource) -> Result<Self, CoreError> {
        let (videos, modules, categories) = tokio::try_join!(
            source.load_videos(),
            source.load_modules(),
            source.load_categories()
        )?;
        Ok(Self::new(videos, modules, categories))
    }

    /// Drops duplicate video ids (first wins) and unassigns videos whose
    /// module doesn't exist. Neither fails the load.
    pub fn new(videos: Vec<Video>, mut modules: Vec<Module>, categories: Vec<Category>) -> Self {
        modules.sort_by_key(|m| m.order);
        let module_ids: HashSet<&str> = modules.iter().map(|m| m.id.as_str()).collect();

        let mut kept: Vec<Video> = Vec::with_capacity(videos.len());
        let mut video_index = HashMap::with_capacity(videos.len());
        for mut v in videos {
            if video_index.contains_key(&v.id) {
                tracing::warn!(video_id = v.id, "duplicate video id, keeping first");
                continue;
            }
            if let Some(mid) = v.module_id.as_deref() {
                if !module_ids.contains(mid) {
                    tracing::warn!(video_id = v.id, module_id = mid, "unknown module, treating video as unassigned");
                    v.module_id = None;
                }
            }
            if !(v.duration.is_finite() && v.duration > 0.0) {
                tracing::warn!(video_id = v.id, duration = v.duration, "non-positive duration, progress will read 0%");
            }
            video_index.insert(v.id, kept.len());
            kept.push(v);
        }

        tracing::info!(
            videos = kept.len(),
            modules = modules.len(),
            categories = categories.len(),
            "catalog loaded"
        );
        Self { videos: kept, modules, categories, video_index }
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn video(&self, id: VideoId) -> Result<&Video, CoreError> {
        self.video_index
            .get(&id)
            .map(|&i| &self.videos[i])
            .ok_or_else(|| CoreError::not_found("video", id))
    }

    pub fn module(&self, slug: &str) -> Result<&Module, CoreError> {
        self.modules
            .iter()
            .find(|m| m.id == slug)
            .ok_or_else(|| CoreError::not_found("module", slug))
    }

    pub fn module_by_numeric_id(&self, numeric_id: i64) -> Result<&Module, CoreError> {
        self.modules
            .iter()
            .find(|m| m.numeric_id == numeric_id)
            .ok_or_else(|| CoreError::not_found("module", numeric_id))
    }

    pub fn category(&self, id: &str) -> Result<&Category, CoreError> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| CoreError::not_found("category", id))
    }

    /// A module's playlist, sorted by `order`.
    pub fn videos_by_module(&self, slug: &str) -> Vec<Video> {
        let mut out: Vec<Video> = self
            .videos
            .iter()
            .filter(|v| v.module_id.as_deref() == Some(slug))
            .cloned()
            .collect();
        out.sort_by_key(|v| v.order);
        out
    }

    pub fn videos_by_category(&self, category: &str) -> Vec<Video> {
        self.videos
            .iter()
            .filter(|v| v.category == category)
            .cloned()
            .collect()
    }

    pub fn search(&self, query: &str) -> Vec<Video> {
        self.videos
            .iter()
            .filter(|v| ordering::matches_query(v, query))
            .cloned()
            .collect()
    }
}

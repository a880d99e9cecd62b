use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::{
    error::CoreError,
    models::*,
    ordering::{self, SortMode},
    session::LearningSession,
    stats::{self, LearningStats, ModuleDetailStats, ModuleProgress},
};

type Session = Arc<LearningSession>;
type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub fn router(session: Session, media_dir: PathBuf) -> Router {
    Router::new()
        // catalog
        .route("/api/videos", get(list_videos))
        .route("/api/videos/:id", get(get_video))
        .route("/api/videos/:id/navigation", get(video_navigation))
        .route("/api/modules", get(list_modules))
        .route("/api/modules/progress", get(modules_progress))
        .route("/api/modules/:slug", get(module_detail))
        .route("/api/categories", get(list_categories))
        .route("/api/catalog/reload", post(reload_catalog))
        // progress
        .route("/api/progress", get(get_progress))
        .route("/api/progress/overview", get(progress_overview))
        .route("/api/progress/:video_id", get(get_video_progress).post(record_playback))
        .route("/api/progress/:video_id/bookmarks", post(toggle_bookmark))
        // summaries
        .route("/api/stats", get(get_stats))
        .route("/api/dashboard", get(dashboard))
        // media referenced by Video.url / thumbnail
        .nest_service("/media", ServeDir::new(media_dir))
        .with_state(session)
}

#[derive(Deserialize, Debug, Default)]
pub struct ListQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub sort: Option<SortMode>,
}

async fn list_videos(State(s): State<Session>, Query(q): Query<ListQuery>) -> ApiResult<Vec<Video>> {
    let catalog = s.catalog().await.map_err(e_core)?;
    let progress = s.progress().await;
    Ok(Json(ordering::filter_and_sort(
        catalog.videos(),
        q.q.as_deref(),
        q.category.as_deref(),
        q.sort.unwrap_or_default(),
        &progress,
    )))
}

async fn get_video(State(s): State<Session>, Path(id): Path<VideoId>) -> ApiResult<Video> {
    let catalog = s.catalog().await.map_err(e_core)?;
    let video = catalog.video(id).map_err(e_core)?;
    Ok(Json(video.clone()))
}

#[derive(Deserialize, Debug)]
pub struct NavigationQuery {
    pub module: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResp {
    pub previous: Option<Video>,
    pub next: Option<Video>,
    pub auto_advance: Option<Video>,
}

async fn video_navigation(
    State(s): State<Session>,
    Path(id): Path<VideoId>,
    Query(q): Query<NavigationQuery>,
) -> ApiResult<NavigationResp> {
    let catalog = s.catalog().await.map_err(e_core)?;
    let video = catalog.video(id).map_err(e_core)?;
    let Some(slug) = q.module.or_else(|| video.module_id.clone()) else {
        return Ok(Json(NavigationResp { previous: None, next: None, auto_advance: None }));
    };
    catalog.module(&slug).map_err(e_core)?;

    let playlist = catalog.videos_by_module(&slug);
    let progress = s.progress().await;
    Ok(Json(NavigationResp {
        previous: ordering::previous_video(&playlist, id).cloned(),
        next: ordering::next_video(&playlist, id).cloned(),
        auto_advance: ordering::auto_advance_target(&playlist, id, &progress).cloned(),
    }))
}

async fn list_modules(State(s): State<Session>) -> ApiResult<Vec<Module>> {
    let catalog = s.catalog().await.map_err(e_core)?;
    Ok(Json(catalog.modules().to_vec()))
}

async fn modules_progress(State(s): State<Session>) -> ApiResult<Vec<ModuleProgress>> {
    let catalog = s.catalog().await.map_err(e_core)?;
    let progress = s.progress().await;
    Ok(Json(stats::modules_by_progress(catalog.modules(), catalog.videos(), &progress)))
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDetailResp {
    pub module: Module,
    pub videos: Vec<Video>,
    pub stats: ModuleDetailStats,
    pub resume: Option<Video>,
}

async fn module_detail(State(s): State<Session>, Path(slug): Path<String>) -> ApiResult<ModuleDetailResp> {
    let catalog = s.catalog().await.map_err(e_core)?;
    let module = catalog.module(&slug).map_err(e_core)?.clone();
    let videos = catalog.videos_by_module(&slug);
    let progress = s.progress().await;
    Ok(Json(ModuleDetailResp {
        stats: stats::module_detail(&videos, &progress),
        resume: ordering::resume_video(&videos, &progress).cloned(),
        module,
        videos,
    }))
}

async fn list_categories(State(s): State<Session>) -> ApiResult<Vec<Category>> {
    let catalog = s.catalog().await.map_err(e_core)?;
    Ok(Json(catalog.categories().to_vec()))
}

async fn reload_catalog(State(s): State<Session>) -> ApiResult<serde_json::Value> {
    let catalog = s.reload_catalog().await.map_err(e_core)?;
    Ok(Json(serde_json::json!({
        "videos": catalog.videos().len(),
        "modules": catalog.modules().len(),
        "categories": catalog.categories().len(),
    })))
}

async fn get_progress(State(s): State<Session>) -> ApiResult<ProgressMap> {
    Ok(Json(s.progress().await))
}

async fn get_video_progress(State(s): State<Session>, Path(video_id): Path<VideoId>) -> ApiResult<ProgressRecord> {
    Ok(Json(s.progress_for(video_id).await))
}

async fn record_playback(
    State(s): State<Session>,
    Path(video_id): Path<VideoId>,
    Json(req): Json<RecordPlaybackReq>,
) -> ApiResult<PlaybackOutcome> {
    if !req.watched_seconds.is_finite() || req.watched_seconds < 0.0 {
        return Err(e_core(CoreError::Validation(
            "watchedSeconds must be a non-negative number".into(),
        )));
    }
    Ok(Json(s.record_playback(video_id, req.watched_seconds, req.completed).await))
}

async fn toggle_bookmark(
    State(s): State<Session>,
    Path(video_id): Path<VideoId>,
    Json(req): Json<BookmarkReq>,
) -> ApiResult<ProgressRecord> {
    if !req.timestamp.is_finite() || req.timestamp < 0.0 {
        return Err(e_core(CoreError::Validation(
            "timestamp must be a non-negative number".into(),
        )));
    }
    Ok(Json(s.toggle_bookmark(video_id, req.timestamp, req.action).await))
}

async fn get_stats(State(s): State<Session>) -> ApiResult<LearningStats> {
    let catalog = s.catalog().await.map_err(e_core)?;
    let progress = s.progress().await;
    Ok(Json(LearningStats::compute(catalog.videos(), &progress, s.now())))
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResp {
    pub stats: LearningStats,
    pub continue_watching: Vec<Video>,
    pub recommended: Vec<Video>,
    pub modules: Vec<ModuleProgress>,
}

async fn dashboard(State(s): State<Session>) -> ApiResult<DashboardResp> {
    let catalog = s.catalog().await.map_err(e_core)?;
    let progress = s.progress().await;
    let videos = catalog.videos();
    Ok(Json(DashboardResp {
        stats: LearningStats::compute(videos, &progress, s.now()),
        continue_watching: ordering::continue_watching(videos, &progress, Some(ordering::CONTINUE_WATCHING_LIMIT)),
        recommended: ordering::recommended(videos, &progress, Some(ordering::RECOMMENDED_LIMIT)),
        modules: catalog
            .modules()
            .iter()
            .map(|m| stats::module_progress(m, videos, &progress))
            .collect(),
    }))
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOverviewResp {
    pub stats: LearningStats,
    pub in_progress: Vec<Video>,
    pub recently_watched: Vec<Video>,
    pub completed: Vec<Video>,
}

async fn progress_overview(State(s): State<Session>) -> ApiResult<ProgressOverviewResp> {
    let catalog = s.catalog().await.map_err(e_core)?;
    let progress = s.progress().await;
    let videos = catalog.videos();
    Ok(Json(ProgressOverviewResp {
        stats: LearningStats::compute(videos, &progress, s.now()),
        in_progress: ordering::in_progress(videos, &progress, Some(ordering::IN_PROGRESS_LIMIT)),
        recently_watched: ordering::recently_watched(videos, &progress, Some(ordering::RECENTLY_WATCHED_LIMIT)),
        completed: ordering::completed_videos(videos, &progress),
    }))
}

// --- helpers ---
fn e_core(e: CoreError) -> (StatusCode, String) {
    match &e {
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
        CoreError::LoadFailure(_) => {
            tracing::error!(error = %e, "catalog unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, format!("{e}, retry later"))
        }
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
    }
}

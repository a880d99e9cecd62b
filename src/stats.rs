//! Aggregate and per-module statistics over a catalog and a progress snapshot.
//!
//! Every function here is total: missing records count as unstarted and empty
//! inputs produce zeros, never NaN.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::models::{display_percentage, watch_percentage, Module, ProgressMap, Video};

pub fn completion_count(progress: &ProgressMap) -> usize {
    progress.values().filter(|p| p.completed).count()
}

/// Sum over every record, including ones whose video left the catalog.
pub fn total_watch_time(progress: &ProgressMap) -> f64 {
    progress
        .values()
        .map(|p| p.watched_seconds)
        .filter(|s| s.is_finite())
        .sum()
}

/// Mean capped percentage over all videos; unwatched videos count as 0.
pub fn average_progress(videos: &[Video], progress: &ProgressMap) -> f64 {
    if videos.is_empty() {
        return 0.0;
    }
    let sum: f64 = videos
        .iter()
        .map(|v| display_percentage(v, progress.get(&v.id)))
        .sum();
    sum / videos.len() as f64
}

/// Percentage of videos watched to at least 90%, regardless of the `completed` flag.
pub fn completion_rate(videos: &[Video], progress: &ProgressMap) -> f64 {
    if videos.is_empty() {
        return 0.0;
    }
    let nearly = videos
        .iter()
        .filter(|v| watch_percentage(v, progress.get(&v.id)) >= 90.0)
        .count();
    nearly as f64 / videos.len() as f64 * 100.0
}

/// Completed share of the whole catalog (dashboard ring).
pub fn overall_progress(videos: &[Video], progress: &ProgressMap) -> f64 {
    percent(completion_count(progress), videos.len())
}

/// Consecutive UTC days with activity, ending today or yesterday.
pub fn learning_streak(progress: &ProgressMap, now: DateTime<Utc>) -> u32 {
    let days: HashSet<NaiveDate> = progress
        .values()
        .filter_map(|p| p.last_watched)
        .map(|t| t.date_naive())
        .collect();

    let today = now.date_naive();
    let mut cursor = if days.contains(&today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(d) if days.contains(&d) => d,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.checked_sub_days(Days::new(1)) {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
    pub total_videos: usize,
    pub completed_videos: usize,
    pub total_watch_time: f64,
    pub average_progress: f64,
    pub completion_rate: f64,
    pub overall_progress: f64,
    pub streak: u32,
}

impl LearningStats {
    pub fn compute(videos: &[Video], progress: &ProgressMap, now: DateTime<Utc>) -> Self {
        Self {
            total_videos: videos.len(),
            completed_videos: completion_count(progress),
            total_watch_time: total_watch_time(progress),
            average_progress: average_progress(videos, progress),
            completion_rate: completion_rate(videos, progress),
            overall_progress: overall_progress(videos, progress),
            streak: learning_streak(progress, now),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    pub module_id: String,
    pub name: String,
    pub completed_videos: usize,
    pub total_videos: usize,
    /// Unrounded; 0 for a module without videos.
    pub progress: f64,
}

pub fn module_progress(module: &Module, videos: &[Video], progress: &ProgressMap) -> ModuleProgress {
    let in_module: Vec<&Video> = videos
        .iter()
        .filter(|v| v.module_id.as_deref() == Some(module.id.as_str()))
        .collect();
    let completed = in_module
        .iter()
        .filter(|v| progress.get(&v.id).is_some_and(|p| p.completed))
        .count();

    ModuleProgress {
        module_id: module.id.clone(),
        name: module.name.clone(),
        completed_videos: completed,
        total_videos: in_module.len(),
        progress: percent(completed, in_module.len()),
    }
}

/// Stats for every module, most advanced first. Ties keep module order.
pub fn modules_by_progress(
    modules: &[Module],
    videos: &[Video],
    progress: &ProgressMap,
) -> Vec<ModuleProgress> {
    let mut out: Vec<ModuleProgress> = modules
        .iter()
        .map(|m| module_progress(m, videos, progress))
        .collect();
    out.sort_by(|a, b| b.progress.total_cmp(&a.progress));
    out
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDetailStats {
    pub completed_videos: usize,
    pub total_videos: usize,
    pub total_duration: f64,
    pub watched_time: f64,
    pub progress: f64,
}

/// Course page numbers. `module_videos` are the videos of one module.
pub fn module_detail(module_videos: &[Video], progress: &ProgressMap) -> ModuleDetailStats {
    let completed = module_videos
        .iter()
        .filter(|v| progress.get(&v.id).is_some_and(|p| p.completed))
        .count();
    let total_duration = module_videos
        .iter()
        .map(|v| v.duration)
        .filter(|d| d.is_finite())
        .sum();
    let watched_time = module_videos
        .iter()
        .filter_map(|v| progress.get(&v.id))
        .map(|p| p.watched_seconds)
        .filter(|s| s.is_finite())
        .sum();

    ModuleDetailStats {
        completed_videos: completed,
        total_videos: module_videos.len(),
        total_duration,
        watched_time,
        progress: percent(completed, module_videos.len()),
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr};
use std::collections::HashMap;

pub type VideoId = i64;

/// Snapshot of every progress record, keyed by video id.
pub type ProgressMap = HashMap<VideoId, ProgressRecord>;

/// Watch ratio at which a video counts as completed.
pub const COMPLETION_THRESHOLD: f64 = 0.90;

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "Id")]
    pub id: VideoId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    // seconds; missing or null reads as 0 so the video shows 0%
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    // slug used for routing
    pub id: String,
    #[serde(rename = "Id")]
    pub numeric_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub total_videos: u32,
    #[serde(default)]
    pub estimated_time: u64, // seconds
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    #[serde(rename = "Id", default)]
    pub numeric_id: i64,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    // fixtures carry the id as a string
    #[serde_as(as = "DisplayFromStr")]
    pub video_id: VideoId,
    #[serde(default)]
    pub watched_seconds: f64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub last_watched: Option<DateTime<Utc>>,
    #[serde(default)]
    pub bookmarks: Vec<f64>,
}

impl ProgressRecord {
    /// A record for a video nobody has touched yet.
    pub fn unstarted(video_id: VideoId) -> Self {
        Self {
            video_id,
            watched_seconds: 0.0,
            completed: false,
            last_watched: None,
            bookmarks: Vec::new(),
        }
    }

    pub fn state(&self) -> ProgressState {
        if self.completed {
            ProgressState::Completed
        } else if self.watched_seconds > 0.0 {
            ProgressState::InProgress
        } else {
            ProgressState::Unstarted
        }
    }
}

/// Lifecycle of a single video's progress. `Completed` is terminal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    Unstarted,
    InProgress,
    Completed,
}

/// Raw watch percentage, uncapped. Zero, negative or non-finite durations give 0.
pub fn watch_percentage(video: &Video, record: Option<&ProgressRecord>) -> f64 {
    match record {
        Some(r) if video.duration.is_finite() && video.duration > 0.0 => {
            let pct = r.watched_seconds * 100.0 / video.duration;
            if pct.is_finite() { pct.max(0.0) } else { 0.0 }
        }
        _ => 0.0,
    }
}

/// Watch percentage capped at 100 for display and averaging.
pub fn display_percentage(video: &Video, record: Option<&ProgressRecord>) -> f64 {
    watch_percentage(video, record).min(100.0)
}

/// True once `watched_seconds` reaches the completion threshold of `duration`.
pub fn crosses_threshold(watched_seconds: f64, duration: f64) -> bool {
    duration.is_finite() && duration > 0.0 && watched_seconds >= duration * COMPLETION_THRESHOLD
}

// --- wire types ---

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecordPlaybackReq {
    pub watched_seconds: f64,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkAction {
    Add,
    Remove,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BookmarkReq {
    pub timestamp: f64,
    pub action: BookmarkAction,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackOutcome {
    pub record: ProgressRecord,
    pub newly_completed: bool,
}

//! Selection and ordering of videos for listings, dashboards and navigation.
//!
//! All sorts are stable, so ties keep catalog order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{watch_percentage, ProgressMap, ProgressRecord, Video, VideoId};

pub const CONTINUE_WATCHING_LIMIT: usize = 4;
pub const RECOMMENDED_LIMIT: usize = 4;
pub const RECENTLY_WATCHED_LIMIT: usize = 6;
pub const IN_PROGRESS_LIMIT: usize = 6;

/// Category value that disables the category filter.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Order,
    Title,
    Duration,
    Newest,
    Progress,
}

fn is_in_progress(record: Option<&ProgressRecord>) -> bool {
    record.is_some_and(|p| p.watched_seconds > 0.0 && !p.completed)
}

fn is_completed(record: Option<&ProgressRecord>) -> bool {
    record.is_some_and(|p| p.completed)
}

// descending, records without a timestamp last
fn by_recency_desc(progress: &ProgressMap, a: &Video, b: &Video) -> Ordering {
    let la = progress.get(&a.id).and_then(|p| p.last_watched);
    let lb = progress.get(&b.id).and_then(|p| p.last_watched);
    lb.cmp(&la)
}

fn by_percentage_desc(progress: &ProgressMap, a: &Video, b: &Video) -> Ordering {
    let pa = watch_percentage(a, progress.get(&a.id));
    let pb = watch_percentage(b, progress.get(&b.id));
    pb.total_cmp(&pa)
}

fn take(mut videos: Vec<Video>, limit: Option<usize>) -> Vec<Video> {
    if let Some(n) = limit {
        videos.truncate(n);
    }
    videos
}

/// Started but unfinished videos, most recently watched first.
pub fn continue_watching(videos: &[Video], progress: &ProgressMap, limit: Option<usize>) -> Vec<Video> {
    let mut out: Vec<Video> = videos
        .iter()
        .filter(|v| is_in_progress(progress.get(&v.id)))
        .cloned()
        .collect();
    out.sort_by(|a, b| by_recency_desc(progress, a, b));
    take(out, limit)
}

/// Unfinished videos in catalog order.
pub fn recommended(videos: &[Video], progress: &ProgressMap, limit: Option<usize>) -> Vec<Video> {
    let out = videos
        .iter()
        .filter(|v| !is_completed(progress.get(&v.id)))
        .cloned()
        .collect();
    take(out, limit)
}

/// Every video with a `last_watched`, newest first.
pub fn recently_watched(videos: &[Video], progress: &ProgressMap, limit: Option<usize>) -> Vec<Video> {
    let mut out: Vec<Video> = videos
        .iter()
        .filter(|v| progress.get(&v.id).is_some_and(|p| p.last_watched.is_some()))
        .cloned()
        .collect();
    out.sort_by(|a, b| by_recency_desc(progress, a, b));
    take(out, limit)
}

/// Same filter as [`continue_watching`], furthest along first.
pub fn in_progress(videos: &[Video], progress: &ProgressMap, limit: Option<usize>) -> Vec<Video> {
    let mut out: Vec<Video> = videos
        .iter()
        .filter(|v| is_in_progress(progress.get(&v.id)))
        .cloned()
        .collect();
    out.sort_by(|a, b| by_percentage_desc(progress, a, b));
    take(out, limit)
}

/// All completed videos, most recently watched first. Unbounded.
pub fn completed_videos(videos: &[Video], progress: &ProgressMap) -> Vec<Video> {
    let mut out: Vec<Video> = videos
        .iter()
        .filter(|v| is_completed(progress.get(&v.id)))
        .cloned()
        .collect();
    out.sort_by(|a, b| by_recency_desc(progress, a, b));
    out
}

pub fn sort_videos(videos: &mut [Video], mode: SortMode, progress: &ProgressMap) {
    match mode {
        SortMode::Order => videos.sort_by_key(|v| v.order),
        SortMode::Title => videos.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.title.cmp(&b.title))
        }),
        SortMode::Duration => videos.sort_by(|a, b| a.duration.total_cmp(&b.duration)),
        SortMode::Newest => videos.sort_by(|a, b| b.id.cmp(&a.id)),
        SortMode::Progress => videos.sort_by(|a, b| by_percentage_desc(progress, a, b)),
    }
}

/// Case-insensitive substring match on title, description or any tag.
pub fn matches_query(video: &Video, query: &str) -> bool {
    let q = query.to_lowercase();
    video.title.to_lowercase().contains(&q)
        || video.description.to_lowercase().contains(&q)
        || video.tags.iter().any(|t| t.to_lowercase().contains(&q))
}

pub fn matches_category(video: &Video, category: &str) -> bool {
    category == ALL_CATEGORIES || video.category == category
}

/// Search, then category, then sort. Empty query or category means no filter.
pub fn filter_and_sort(
    videos: &[Video],
    query: Option<&str>,
    category: Option<&str>,
    mode: SortMode,
    progress: &ProgressMap,
) -> Vec<Video> {
    let query = query.filter(|q| !q.is_empty());
    let category = category.filter(|c| !c.is_empty());
    let mut out: Vec<Video> = videos
        .iter()
        .filter(|v| query.map_or(true, |q| matches_query(v, q)))
        .filter(|v| category.map_or(true, |c| matches_category(v, c)))
        .cloned()
        .collect();
    sort_videos(&mut out, mode, progress);
    out
}

/// Video following `current` in an order-sorted module playlist.
pub fn next_video<'a>(module_videos: &'a [Video], current: VideoId) -> Option<&'a Video> {
    let idx = module_videos.iter().position(|v| v.id == current)?;
    module_videos.get(idx + 1)
}

/// Video preceding `current` in an order-sorted module playlist.
pub fn previous_video<'a>(module_videos: &'a [Video], current: VideoId) -> Option<&'a Video> {
    let idx = module_videos.iter().position(|v| v.id == current)?;
    idx.checked_sub(1).and_then(|i| module_videos.get(i))
}

/// Next video to auto-advance to: only if it isn't already completed.
pub fn auto_advance_target<'a>(
    module_videos: &'a [Video],
    current: VideoId,
    progress: &ProgressMap,
) -> Option<&'a Video> {
    next_video(module_videos, current).filter(|v| !is_completed(progress.get(&v.id)))
}

/// First unfinished video of an order-sorted module playlist.
pub fn resume_video<'a>(module_videos: &'a [Video], progress: &ProgressMap) -> Option<&'a Video> {
    module_videos
        .iter()
        .find(|v| !is_completed(progress.get(&v.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::tests::{record, video};

    fn map(records: Vec<ProgressRecord>) -> ProgressMap {
        records.into_iter().map(|r| (r.video_id, r)).collect()
    }

    fn ids(videos: &[Video]) -> Vec<VideoId> {
        videos.iter().map(|v| v.id).collect()
    }

    #[test]
    fn continue_watching_newest_first_and_capped() {
        let videos: Vec<Video> = (1..=6).map(|i| video(i, 100.0, None)).collect();
        let progress = map(vec![
            record(1, 10.0, false, Some(100)),
            record(2, 10.0, false, Some(500)),
            record(3, 0.0, false, Some(900)),
            record(4, 10.0, false, Some(300)),
            record(5, 10.0, false, Some(400)),
            record(6, 10.0, false, Some(200)),
        ]);
        let out = continue_watching(&videos, &progress, Some(CONTINUE_WATCHING_LIMIT));
        assert_eq!(ids(&out), vec![2, 5, 4, 6]);
    }

    #[test]
    fn continue_watching_drops_completed_even_if_latest() {
        let videos = vec![video(1, 100.0, None), video(2, 100.0, None)];
        let progress = map(vec![record(1, 95.0, true, Some(999)), record(2, 10.0, false, Some(1))]);
        assert_eq!(ids(&continue_watching(&videos, &progress, None)), vec![2]);
    }

    #[test]
    fn continue_watching_ties_keep_catalog_order() {
        let videos = vec![video(3, 100.0, None), video(1, 100.0, None), video(2, 100.0, None)];
        let progress = map(vec![
            record(1, 5.0, false, Some(50)),
            record(2, 5.0, false, Some(50)),
            record(3, 5.0, false, Some(50)),
        ]);
        assert_eq!(ids(&continue_watching(&videos, &progress, None)), vec![3, 1, 2]);
    }

    #[test]
    fn recommended_skips_completed() {
        let videos: Vec<Video> = (1..=6).map(|i| video(i, 100.0, None)).collect();
        let progress = map(vec![record(2, 100.0, true, None), record(3, 50.0, false, None)]);
        let out = recommended(&videos, &progress, Some(RECOMMENDED_LIMIT));
        assert_eq!(ids(&out), vec![1, 3, 4, 5]);
    }

    #[test]
    fn recently_watched_requires_timestamp() {
        let videos: Vec<Video> = (1..=3).map(|i| video(i, 100.0, None)).collect();
        let progress = map(vec![record(1, 5.0, true, Some(10)), record(2, 5.0, false, None), record(3, 1.0, false, Some(20))]);
        assert_eq!(ids(&recently_watched(&videos, &progress, None)), vec![3, 1]);
    }

    #[test]
    fn in_progress_by_percentage() {
        let videos = vec![video(1, 100.0, None), video(2, 200.0, None), video(3, 10.0, None)];
        let progress = map(vec![
            record(1, 30.0, false, Some(3)),
            record(2, 120.0, false, Some(2)),
            record(3, 8.0, true, Some(1)),
        ]);
        assert_eq!(ids(&in_progress(&videos, &progress, Some(IN_PROGRESS_LIMIT))), vec![2, 1]);
    }

    #[test]
    fn completed_list_is_unbounded() {
        let videos: Vec<Video> = (1..=10).map(|i| video(i, 10.0, None)).collect();
        let progress: ProgressMap = (1..=10).map(|i| (i, record(i, 10.0, true, Some(i)))).collect();
        let out = completed_videos(&videos, &progress);
        assert_eq!(out.len(), 10);
        assert_eq!(out[0].id, 10);
    }

    #[test]
    fn order_sort_is_stable() {
        let mut videos = vec![video(5, 1.0, None), video(2, 1.0, None), video(9, 1.0, None)];
        for v in &mut videos {
            v.order = 1;
        }
        sort_videos(&mut videos, SortMode::Order, &ProgressMap::new());
        assert_eq!(ids(&videos), vec![5, 2, 9]);
    }

    #[test]
    fn sort_modes() {
        let mut videos = vec![video(1, 30.0, None), video(2, 10.0, None), video(3, 20.0, None)];
        videos[0].title = "banana".into();
        videos[1].title = "Apple".into();
        videos[2].title = "cherry".into();
        let progress = map(vec![record(1, 15.0, false, None), record(3, 19.0, false, None)]);

        let mut v = videos.clone();
        sort_videos(&mut v, SortMode::Title, &progress);
        assert_eq!(ids(&v), vec![2, 1, 3]);

        sort_videos(&mut v, SortMode::Duration, &progress);
        assert_eq!(ids(&v), vec![2, 3, 1]);

        sort_videos(&mut v, SortMode::Newest, &progress);
        assert_eq!(ids(&v), vec![3, 2, 1]);

        sort_videos(&mut v, SortMode::Progress, &progress);
        assert_eq!(ids(&v), vec![3, 1, 2]);
    }

    #[test]
    fn search_hits_any_field() {
        let mut v = video(1, 1.0, None);
        v.title = "Ownership".into();
        v.description = "Borrowing rules".into();
        v.tags = vec!["Lifetimes".into()];
        assert!(matches_query(&v, "OWNER"));
        assert!(matches_query(&v, "borrow"));
        assert!(matches_query(&v, "lifetime"));
        assert!(!matches_query(&v, "async"));
    }

    #[test]
    fn filter_and_sort_combines() {
        let mut videos: Vec<Video> = (1..=4).map(|i| video(i, 1.0, None)).collect();
        videos[0].category = "rust".into();
        videos[1].category = "go".into();
        videos[2].category = "rust".into();
        videos[3].category = "rust".into();
        videos[3].title = "Something else".into();

        let out = filter_and_sort(&videos, Some("video"), Some("rust"), SortMode::Newest, &ProgressMap::new());
        assert_eq!(ids(&out), vec![3, 1]);

        let all = filter_and_sort(&videos, Some(""), Some(ALL_CATEGORIES), SortMode::Order, &ProgressMap::new());
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn navigation_helpers() {
        let playlist = vec![video(1, 1.0, None), video(2, 1.0, None), video(3, 1.0, None)];
        let progress = map(vec![record(1, 1.0, true, None), record(2, 1.0, true, None)]);

        assert_eq!(next_video(&playlist, 1).map(|v| v.id), Some(2));
        assert!(next_video(&playlist, 3).is_none());
        assert!(next_video(&playlist, 42).is_none());

        assert!(previous_video(&playlist, 1).is_none());
        assert_eq!(previous_video(&playlist, 2).map(|v| v.id), Some(1));
        assert_eq!(previous_video(&playlist, 3).map(|v| v.id), Some(2));
        assert!(previous_video(&playlist, 42).is_none());

        assert!(auto_advance_target(&playlist, 1, &progress).is_none());
        assert_eq!(auto_advance_target(&playlist, 2, &progress).map(|v| v.id), Some(3));

        assert_eq!(resume_video(&playlist, &progress).map(|v| v.id), Some(3));
    }
}

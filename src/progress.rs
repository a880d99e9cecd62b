use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::models::{crosses_threshold, ProgressMap, ProgressRecord, VideoId};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Per-session progress records. Records are created lazily on first write and
/// never deleted.
pub struct ProgressStore {
    records: ProgressMap,
    clock: Arc<dyn Clock>,
}

impl ProgressStore {
    pub fn new(records: ProgressMap, clock: Arc<dyn Clock>) -> Self {
        Self { records, clock }
    }

    pub fn get(&self) -> &ProgressMap {
        &self.records
    }

    pub fn snapshot(&self) -> ProgressMap {
        self.records.clone()
    }

    pub fn get_or_default(&self, video_id: VideoId) -> ProgressRecord {
        self.records
            .get(&video_id)
            .cloned()
            .unwrap_or_else(|| ProgressRecord::unstarted(video_id))
    }

    /// Overwrites `watched_seconds` (no max) and stamps `last_watched`.
    /// `duration` comes from the caller since the store has no catalog.
    /// Once completed a record stays completed.
    pub fn update(
        &mut self,
        video_id: VideoId,
        watched_seconds: f64,
        duration: f64,
        completed_override: bool,
    ) -> ProgressRecord {
        let now = self.clock.now();
        let rec = self.entry(video_id);
        rec.watched_seconds = watched_seconds;
        rec.completed =
            rec.completed || completed_override || crosses_threshold(watched_seconds, duration);
        rec.last_watched = Some(now);
        rec.clone()
    }

    /// Appends without dedup. A new record gets `last_watched` = now.
    pub fn add_bookmark(&mut self, video_id: VideoId, timestamp: f64) -> ProgressRecord {
        if !self.records.contains_key(&video_id) {
            let mut rec = ProgressRecord::unstarted(video_id);
            rec.last_watched = Some(self.clock.now());
            self.records.insert(video_id, rec);
        }
        let rec = self.entry(video_id);
        rec.bookmarks.push(timestamp);
        rec.clone()
    }

    /// Drops every exact match of `timestamp`. Missing record or bookmark is a no-op.
    pub fn remove_bookmark(&mut self, video_id: VideoId, timestamp: f64) -> ProgressRecord {
        match self.records.get_mut(&video_id) {
            Some(rec) => {
                rec.bookmarks.retain(|t| *t != timestamp);
                rec.clone()
            }
            None => ProgressRecord::unstarted(video_id),
        }
    }

    fn entry(&mut self, video_id: VideoId) -> &mut ProgressRecord {
        self.records
            .entry(video_id)
            .or_insert_with(|| ProgressRecord::unstarted(video_id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::ProgressState;
    use chrono::TimeZone;
    use std::sync::Mutex;

    pub(crate) struct FixedClock(pub Mutex<DateTime<Utc>>);

    impl FixedClock {
        pub(crate) fn at(secs: i64) -> Arc<Self> {
            Arc::new(Self(Mutex::new(Utc.timestamp_opt(secs, 0).unwrap())))
        }

        pub(crate) fn advance(&self, secs: i64) {
            let mut t = self.0.lock().unwrap();
            *t += chrono::Duration::seconds(secs);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn store_at(secs: i64) -> (ProgressStore, Arc<FixedClock>) {
        let clock = FixedClock::at(secs);
        (ProgressStore::new(ProgressMap::new(), clock.clone()), clock)
    }

    #[test]
    fn ninety_percent_completes() {
        let (mut store, _) = store_at(1_700_000_000);
        let rec = store.update(1, 600.0 * 0.9, 600.0, false);
        assert!(rec.completed);

        let rec = store.update(2, 600.0 * 0.89, 600.0, false);
        assert!(!rec.completed);
        assert_eq!(rec.state(), ProgressState::InProgress);
    }

    #[test]
    fn odd_durations_still_complete_at_threshold() {
        let (mut store, _) = store_at(0);
        for (id, d) in [7.0, 13.3, 451.7, 3599.9].into_iter().enumerate() {
            assert!(store.update(id as i64, d * 0.9, d, false).completed, "duration {d}");
        }
    }

    #[test]
    fn explicit_completion_wins() {
        let (mut store, _) = store_at(0);
        let rec = store.update(4, 10.0, 600.0, true);
        assert!(rec.completed);
    }

    #[test]
    fn completion_is_terminal() {
        let (mut store, _) = store_at(0);
        store.update(1, 560.0, 600.0, false);
        let rec = store.update(1, 5.0, 600.0, false);
        assert_eq!(rec.watched_seconds, 5.0);
        assert!(rec.completed);
        assert_eq!(rec.state(), ProgressState::Completed);
    }

    #[test]
    fn overwrite_not_max() {
        let (mut store, _) = store_at(0);
        store.update(1, 300.0, 600.0, false);
        let rec = store.update(1, 120.0, 600.0, false);
        assert_eq!(rec.watched_seconds, 120.0);
    }

    #[test]
    fn repeated_update_only_moves_last_watched() {
        let (mut store, clock) = store_at(1_000);
        let a = store.update(9, 42.0, 100.0, false);
        clock.advance(30);
        let b = store.update(9, 42.0, 100.0, false);
        assert_eq!(a.watched_seconds, b.watched_seconds);
        assert_eq!(a.completed, b.completed);
        assert!(b.last_watched > a.last_watched);
    }

    #[test]
    fn zero_duration_never_auto_completes() {
        let (mut store, _) = store_at(0);
        let rec = store.update(1, 50.0, 0.0, false);
        assert!(!rec.completed);
    }

    #[test]
    fn unknown_video_gets_defaults() {
        let (store, _) = store_at(0);
        let rec = store.get_or_default(77);
        assert_eq!(rec, ProgressRecord::unstarted(77));
        assert_eq!(rec.state(), ProgressState::Unstarted);
        assert!(store.get().is_empty());
    }

    #[test]
    fn bookmark_add_then_remove_round_trips() {
        let (mut store, _) = store_at(0);
        store.add_bookmark(1, 10.0);
        store.add_bookmark(1, 25.5);
        let before = store.get_or_default(1).bookmarks;

        store.add_bookmark(1, 99.0);
        let after = store.remove_bookmark(1, 99.0);
        assert_eq!(after.bookmarks, before);
    }

    #[test]
    fn remove_bookmark_drops_duplicates() {
        let (mut store, _) = store_at(0);
        store.add_bookmark(1, 5.0);
        store.add_bookmark(1, 7.0);
        store.add_bookmark(1, 5.0);
        assert_eq!(store.get_or_default(1).bookmarks, vec![5.0, 7.0, 5.0]);

        let rec = store.remove_bookmark(1, 5.0);
        assert_eq!(rec.bookmarks, vec![7.0]);
    }

    #[test]
    fn remove_bookmark_on_missing_record_is_noop() {
        let (mut store, _) = store_at(0);
        let rec = store.remove_bookmark(3, 1.0);
        assert!(rec.bookmarks.is_empty());
        assert!(store.get().is_empty());
    }

    #[test]
    fn add_bookmark_creates_record() {
        let (mut store, _) = store_at(500);
        let rec = store.add_bookmark(12, 33.0);
        assert_eq!(rec.watched_seconds, 0.0);
        assert!(!rec.completed);
        assert!(rec.last_watched.is_some());
        assert_eq!(rec.bookmarks, vec![33.0]);
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

/// Entry count above which an insert triggers a sweep.
pub const MAX_ENTRIES: usize = 100;

/// Entries older than this are removed by a sweep.
pub const MAX_AGE_MINUTES: i64 = 15;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone, Debug)]
pub struct CacheEntry<T> {
    pub value: T,
    pub inserted_at: DateTime<Utc>,
}

/// Expiring key-value store for fetched responses.
///
/// Nothing expires on its own. When an insert finds more than
/// [`MAX_ENTRIES`] entries, every entry older than [`MAX_AGE_MINUTES`] is
/// dropped, however many that is. Fresh entries are never evicted, so the
/// cache can grow past the threshold while everything in it is recent.
pub struct FetchCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
    clock: Clock,
}

impl<T> Default for FetchCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FetchCache<T> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn set(&mut self, key: impl Into<String>, value: T) {
        let now = (self.clock)();

        if self.entries.len() > MAX_ENTRIES {
            self.sweep(now);
        }

        let entry = CacheEntry {
            value,
            inserted_at: now,
        };
        self.entries.insert(key.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn sweep(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::minutes(MAX_AGE_MINUTES);
        let before = self.entries.len();

        self.entries.retain(|_, entry| entry.inserted_at >= cutoff);

        debug!(
            "fetch cache sweep removed {} of {} entries",
            before - self.entries.len(),
            before
        );
    }
}

impl<T: Clone> FetchCache<T> {
    pub fn get_cloned(&self, key: &str) -> Option<T> {
        self.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

    impl ManualClock {
        fn start() -> Self {
            let start = Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap();
            Self(Arc::new(Mutex::new(start)))
        }

        fn clock(&self) -> Clock {
            let now = self.0.clone();
            Arc::new(move || *now.lock().unwrap())
        }

        fn advance(&self, minutes: i64) {
            let mut now = self.0.lock().unwrap();
            *now = *now + Duration::minutes(minutes);
        }
    }

    #[test]
    fn test_get_set() {
        let mut cache = FetchCache::new();
        assert!(cache.get("a").is_none());

        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 3);

        assert_eq!(cache.get("a"), Some(&3));
        assert_eq!(cache.get("b"), Some(&2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_sweep_only_removes_old_entries() {
        let time = ManualClock::start();
        let mut cache = FetchCache::with_clock(time.clock());

        cache.set("entry-1", 1);
        time.advance(16);

        for n in 2..=101 {
            cache.set(format!("entry-{n}"), n);
        }
        assert_eq!(cache.len(), 101);

        cache.set("entry-102", 102);

        assert!(!cache.contains_key("entry-1"));
        for n in 2..=102 {
            assert_eq!(cache.get(&format!("entry-{n}")), Some(&n));
        }
    }

    #[test]
    fn test_no_sweep_under_threshold() {
        let time = ManualClock::start();
        let mut cache = FetchCache::with_clock(time.clock());

        cache.set("old", 0);
        time.advance(60);

        for n in 1..100 {
            cache.set(format!("entry-{n}"), n);
        }
        assert_eq!(cache.len(), 100);

        // Exactly at the threshold; no sweep.
        cache.set("one-more", 100);
        assert!(cache.contains_key("old"));

        // Above it; the stale entry goes.
        cache.set("two-more", 101);
        assert!(!cache.contains_key("old"));
    }

    #[test]
    fn test_fresh_entries_survive_size_pressure() {
        let time = ManualClock::start();
        let mut cache = FetchCache::with_clock(time.clock());

        for n in 0..150 {
            cache.set(format!("entry-{n}"), n);
        }

        assert_eq!(cache.len(), 150);
    }
}

//! Time-bounded memoization of recommendation lists
//!
//! Validity is governed by one cache-wide epoch: every `put` refreshes it and
//! `invalidate_all` resets it. A lookup hits only while `now - last_update < ttl`,
//! so a single write keeps every stored entry alive.

use crate::types::{PostId, PostSummary, UserId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Source of the current time
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What a cached list was computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    User(UserId),
    Post(PostId),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::User(id) => write!(f, "user:{}", id),
            CacheKey::Post(id) => write!(f, "post:{}", id),
        }
    }
}

/// A stored recommendation list and the limit it was computed with
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRecommendations {
    pub summaries: Vec<PostSummary>,
    pub limit: usize,
    pub computed_at: DateTime<Utc>,
}

/// Concurrent cache of recommendation lists with a shared TTL epoch
#[derive(Debug)]
pub struct RecommendationCache {
    entries: DashMap<CacheKey, CachedRecommendations>,
    last_update: RwLock<Option<DateTime<Utc>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl RecommendationCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            last_update: RwLock::new(None),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached list for `key` truncated to `n`, if fresh and computed with at least `n`
    pub fn get(&self, key: &CacheKey, n: usize) -> Option<Vec<PostSummary>> {
        if !self.is_fresh() {
            return None;
        }

        let entry = self.entries.get(key)?;
        if entry.limit < n {
            debug!(key = %key, cached_limit = entry.limit, requested = n, "Cached list too short");
            return None;
        }

        Some(entry.summaries.iter().take(n).cloned().collect())
    }

    /// Store a list and refresh the epoch
    pub fn put(&self, key: CacheKey, limit: usize, summaries: Vec<PostSummary>) {
        let now = self.clock.now();
        self.entries.insert(
            key,
            CachedRecommendations {
                summaries,
                limit,
                computed_at: now,
            },
        );
        self.set_epoch(now);
    }

    /// Drop one entry; the epoch is left untouched
    pub fn invalidate(&self, key: &CacheKey) {
        if self.entries.remove(key).is_some() {
            debug!(key = %key, "Invalidated cache entry");
        }
    }

    /// Drop every entry and reset the epoch to now
    pub fn invalidate_all(&self) {
        self.entries.clear();
        self.set_epoch(self.clock.now());
        debug!("Invalidated all cache entries");
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.read()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_fresh(&self) -> bool {
        let Some(last_update) = self.last_update() else {
            return false;
        };

        // A future epoch (clock moved backwards) counts as zero elapsed
        let elapsed = (self.clock.now() - last_update)
            .to_std()
            .unwrap_or(Duration::ZERO);
        elapsed < self.ttl
    }

    fn set_epoch(&self, now: DateTime<Utc>) {
        *self.last_update.write() = Some(now);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::thread;

    /// Clock that only moves when told to
    #[derive(Debug)]
    pub(crate) struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self {
                now: Mutex::new(Utc::now()),
            }
        }

        pub(crate) fn advance(&self, by: Duration) {
            let mut now = self.now.lock();
            *now += chrono::Duration::from_std(by).unwrap();
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }

    fn summary(id: PostId) -> PostSummary {
        PostSummary {
            id,
            title: format!("Post {}", id),
            category: None,
            like_count: 0,
            visit_count: 0,
            score: None,
            reason: None,
        }
    }

    fn cache_with_clock(ttl_secs: u64) -> (RecommendationCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = RecommendationCache::with_clock(Duration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_get_before_any_put_misses() {
        let (cache, _) = cache_with_clock(60);
        assert!(cache.get(&CacheKey::User(1), 1).is_none());
        assert!(cache.last_update().is_none());
    }

    #[test]
    fn test_put_then_get_truncates() {
        let (cache, _) = cache_with_clock(60);
        cache.put(CacheKey::User(1), 3, vec![summary(1), summary(2), summary(3)]);

        let hit = cache.get(&CacheKey::User(1), 2).unwrap();
        assert_eq!(hit.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_larger_request_than_cached_limit_misses() {
        let (cache, _) = cache_with_clock(60);
        cache.put(CacheKey::Post(4), 2, vec![summary(1), summary(2)]);

        assert!(cache.get(&CacheKey::Post(4), 3).is_none());
        assert!(cache.get(&CacheKey::Post(4), 2).is_some());
    }

    #[test]
    fn test_short_result_list_still_hits_within_limit() {
        let (cache, _) = cache_with_clock(60);
        cache.put(CacheKey::Post(4), 5, vec![summary(1)]);

        assert_eq!(cache.get(&CacheKey::Post(4), 5).unwrap().len(), 1);
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let (cache, clock) = cache_with_clock(60);
        cache.put(CacheKey::User(1), 1, vec![summary(1)]);

        clock.advance(Duration::from_secs(59));
        assert!(cache.get(&CacheKey::User(1), 1).is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&CacheKey::User(1), 1).is_none());
    }

    #[test]
    fn test_put_refreshes_shared_epoch() {
        let (cache, clock) = cache_with_clock(60);
        cache.put(CacheKey::User(1), 1, vec![summary(1)]);

        clock.advance(Duration::from_secs(50));
        cache.put(CacheKey::User(2), 1, vec![summary(2)]);

        clock.advance(Duration::from_secs(50));
        // User(1) is 100s old but the epoch was refreshed 50s ago
        assert!(cache.get(&CacheKey::User(1), 1).is_some());
    }

    #[test]
    fn test_invalidate_removes_single_key() {
        let (cache, _) = cache_with_clock(60);
        cache.put(CacheKey::User(1), 1, vec![summary(1)]);
        cache.put(CacheKey::Post(1), 1, vec![summary(2)]);
        let epoch = cache.last_update();

        cache.invalidate(&CacheKey::User(1));

        assert!(cache.get(&CacheKey::User(1), 1).is_none());
        assert!(cache.get(&CacheKey::Post(1), 1).is_some());
        assert_eq!(cache.last_update(), epoch);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_all_clears_and_resets_epoch() {
        let (cache, clock) = cache_with_clock(60);
        cache.put(CacheKey::User(1), 1, vec![summary(1)]);
        clock.advance(Duration::from_secs(10));

        cache.invalidate_all();

        assert!(cache.is_empty());
        assert_eq!(cache.last_update(), Some(clock.now()));
    }

    #[test]
    fn test_user_and_post_keys_are_distinct() {
        let (cache, _) = cache_with_clock(60);
        cache.put(CacheKey::User(7), 1, vec![summary(1)]);

        assert!(cache.get(&CacheKey::Post(7), 1).is_none());
        assert_eq!(CacheKey::User(7).to_string(), "user:7");
        assert_eq!(CacheKey::Post(7).to_string(), "post:7");
    }

    #[test]
    fn test_concurrent_access_never_serves_partial_lists() {
        const THREADS: i64 = 8;
        const ROUNDS: i64 = 2000;
        const LIMIT: usize = 5;

        // Ids encode their key so a hit can be checked against what was put
        fn list_for(user_id: UserId) -> Vec<PostSummary> {
            (0..LIMIT as i64).map(|j| summary(user_id * 100 + j)).collect()
        }

        let cache = Arc::new(RecommendationCache::new(Duration::from_secs(600)));

        let workers: Vec<_> = (0..THREADS)
            .map(|worker| {
                let cache = cache.clone();
                thread::spawn(move || {
                    let mut hits = 0usize;
                    for round in 0..ROUNDS {
                        let user_id = (worker + round) % 4;
                        let key = CacheKey::User(user_id);
                        match round % 3 {
                            0 => cache.put(key, LIMIT, list_for(user_id)),
                            1 => {
                                if let Some(hit) = cache.get(&key, LIMIT) {
                                    assert_eq!(hit, list_for(user_id));
                                    hits += 1;
                                }
                            }
                            _ => cache.invalidate(&key),
                        }
                    }
                    hits
                })
            })
            .collect();

        let hits: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();

        assert!(hits > 0);
        assert!(cache.last_update().is_some());
        assert!(cache.len() <= 4);
        for user_id in 0..4 {
            if let Some(hit) = cache.get(&CacheKey::User(user_id), 3) {
                assert_eq!(hit, list_for(user_id)[..3].to_vec());
            }
        }
    }
}

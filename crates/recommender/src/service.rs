//! Recommendation service facade
//!
//! Ties the store, cache and scoring policy together. Every cache miss captures a
//! fresh [`InteractionSnapshot`] and ranks from that copy. Store failures never
//! reach the caller: they are logged and answered with the newest posts, or an
//! empty list when even that is impossible.

use crate::cache::{CacheKey, Clock, RecommendationCache, SystemClock};
use crate::config::RecommenderConfig;
use crate::error::StoreError;
use crate::scoring::ScoringPolicy;
use crate::store::{InteractionSnapshot, InteractionStore};
use crate::types::{PostId, PostSummary, UserId};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

pub struct RecommendationService {
    store: Arc<dyn InteractionStore>,
    cache: RecommendationCache,
    policy: ScoringPolicy,
    config: RecommenderConfig,
}

impl RecommendationService {
    pub fn new(store: Arc<dyn InteractionStore>, config: RecommenderConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn InteractionStore>,
        config: RecommenderConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = RecommendationCache::with_clock(config.cache_ttl(), clock);
        let policy = ScoringPolicy::new(config.scoring.clone());

        Self {
            store,
            cache,
            policy,
            config,
        }
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn cache(&self) -> &RecommendationCache {
        &self.cache
    }

    pub fn default_limit(&self) -> usize {
        self.config.default_limit
    }

    /// Personalized recommendations, cached per user
    #[instrument(skip(self))]
    pub fn recommend_for_user(&self, user_id: UserId, n: usize) -> Vec<PostSummary> {
        let key = CacheKey::User(user_id);
        if let Some(hit) = self.cache.get(&key, n) {
            debug!(user_id, "Cache hit");
            return hit;
        }

        match self.snapshot() {
            Ok(snapshot) => {
                let results = self.policy.recommendations_for_user(&snapshot, user_id, n);
                self.cache.put(key, n, results.clone());
                results
            }
            Err(e) => self.degraded(e, n),
        }
    }

    /// Posts similar to `post_id`, cached per post
    #[instrument(skip(self))]
    pub fn similar_to_post(&self, post_id: PostId, n: usize) -> Vec<PostSummary> {
        let key = CacheKey::Post(post_id);
        if let Some(hit) = self.cache.get(&key, n) {
            debug!(post_id, "Cache hit");
            return hit;
        }

        match self.snapshot() {
            Ok(snapshot) => {
                let results = self.policy.similar_posts(&snapshot, post_id, n);
                self.cache.put(key, n, results.clone());
                results
            }
            Err(e) => self.degraded(e, n),
        }
    }

    #[instrument(skip(self))]
    pub fn popular(&self, n: usize) -> Vec<PostSummary> {
        match self.snapshot() {
            Ok(snapshot) => self.policy.popular_posts(&snapshot, n),
            Err(e) => self.degraded(e, n),
        }
    }

    #[instrument(skip(self))]
    pub fn recommend_for_anonymous(&self, ip_address: &str, n: usize) -> Vec<PostSummary> {
        match self.snapshot() {
            Ok(snapshot) => self
                .policy
                .recommendations_for_anonymous(&snapshot, ip_address, n),
            Err(e) => self.degraded(e, n),
        }
    }

    #[instrument(skip(self))]
    pub fn on_like_created(&self, user_id: UserId, post_id: PostId) {
        self.cache.invalidate(&CacheKey::User(user_id));
        self.cache.invalidate(&CacheKey::Post(post_id));
    }

    #[instrument(skip(self))]
    pub fn on_like_removed(&self, user_id: UserId, post_id: PostId) {
        self.cache.invalidate(&CacheKey::User(user_id));
        self.cache.invalidate(&CacheKey::Post(post_id));
    }

    #[instrument(skip(self))]
    pub fn on_visit_recorded(&self, post_id: PostId, user_id: Option<UserId>) {
        self.cache.invalidate(&CacheKey::Post(post_id));
        if let Some(user_id) = user_id {
            self.cache.invalidate(&CacheKey::User(user_id));
        }
    }

    #[instrument(skip(self))]
    pub fn flush_cache(&self) {
        self.cache.invalidate_all();
        info!("Recommendation cache flushed");
    }

    /// Flush the cache and precompute recommendations for every known user
    ///
    /// Returns the number of users warmed.
    #[instrument(skip(self))]
    pub fn warm_cache(&self) -> usize {
        self.cache.invalidate_all();

        let snapshot = match self.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Cache warm-up skipped, store unavailable");
                return 0;
            }
        };

        let n = self.config.default_limit;
        for &user_id in &snapshot.users {
            let results = self.policy.recommendations_for_user(&snapshot, user_id, n);
            self.cache.put(CacheKey::User(user_id), n, results);
        }

        info!(users = snapshot.users.len(), "Recommendation cache warmed");
        snapshot.users.len()
    }

    fn snapshot(&self) -> Result<InteractionSnapshot, StoreError> {
        InteractionSnapshot::capture(self.store.as_ref())
    }

    /// Newest posts from the post listing alone, or nothing
    ///
    /// The interaction tables are what failed, so these summaries report zero likes
    /// and zero visits with no score or reason. The counts mean "unknown" here.
    fn degraded(&self, cause: StoreError, n: usize) -> Vec<PostSummary> {
        error!(error = %cause, "Interaction store failed, serving recent posts");

        let mut posts = match self.store.list_posts() {
            Ok(posts) => posts,
            Err(e) => {
                error!(error = %e, "Post listing failed, returning no recommendations");
                return Vec::new();
            }
        };

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        posts
            .into_iter()
            .take(n)
            .map(|post| PostSummary {
                id: post.id,
                title: post.title,
                category: post.category,
                like_count: 0,
                visit_count: 0,
                score: None,
                reason: None,
            })
            .collect()
    }
}

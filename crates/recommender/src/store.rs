//! Interaction store boundary
//!
//! The blog's persistence layer sits behind [`InteractionStore`]. The engine never
//! queries it piecemeal during a computation: [`InteractionSnapshot::capture`] copies
//! all four relations once, and every ranking step reads from that copy. Stores that
//! can read all four under one lock override [`InteractionStore::snapshot`].

use crate::error::StoreError;
use crate::types::{Like, Post, PostId, PostSummary, UserId, Visit};
use chrono::Utc;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Read access to users, posts, likes and visits
pub trait InteractionStore: Send + Sync {
    fn list_users(&self) -> Result<Vec<UserId>, StoreError>;

    fn list_posts(&self) -> Result<Vec<Post>, StoreError>;

    fn list_likes(&self) -> Result<Vec<Like>, StoreError>;

    fn list_visits(&self) -> Result<Vec<Visit>, StoreError>;

    /// All four relations as one [`InteractionSnapshot`]
    ///
    /// The default issues the four listings back to back, so a concurrent writer may
    /// land between them.
    fn snapshot(&self) -> Result<InteractionSnapshot, StoreError> {
        Ok(InteractionSnapshot::new(
            self.list_users()?,
            self.list_posts()?,
            self.list_likes()?,
            self.list_visits()?,
        ))
    }

    fn count_likes_for_post(&self, post_id: PostId) -> Result<usize, StoreError> {
        Ok(self
            .list_likes()?
            .iter()
            .filter(|like| like.post_id == post_id)
            .count())
    }

    fn count_visits_for_post(&self, post_id: PostId) -> Result<usize, StoreError> {
        Ok(self
            .list_visits()?
            .iter()
            .filter(|visit| visit.post_id == post_id)
            .count())
    }
}

/// Point-in-time copy of the store with per-post counters
#[derive(Debug, Clone, Default)]
pub struct InteractionSnapshot {
    pub users: Vec<UserId>,
    /// Sorted by ascending id
    pub posts: Vec<Post>,
    pub likes: Vec<Like>,
    pub visits: Vec<Visit>,
    post_index: HashMap<PostId, usize>,
    like_counts: HashMap<PostId, usize>,
    visit_counts: HashMap<PostId, usize>,
}

impl InteractionSnapshot {
    /// Query the store once and build a snapshot from the results
    pub fn capture(store: &dyn InteractionStore) -> Result<Self, StoreError> {
        let snapshot = store.snapshot()?;

        debug!(
            users = snapshot.users.len(),
            posts = snapshot.posts.len(),
            likes = snapshot.likes.len(),
            visits = snapshot.visits.len(),
            "Captured interaction snapshot"
        );

        Ok(snapshot)
    }

    pub fn new(
        users: Vec<UserId>,
        mut posts: Vec<Post>,
        likes: Vec<Like>,
        visits: Vec<Visit>,
    ) -> Self {
        posts.sort_by_key(|post| post.id);
        let post_index = posts
            .iter()
            .enumerate()
            .map(|(idx, post)| (post.id, idx))
            .collect();

        let mut like_counts: HashMap<PostId, usize> = HashMap::new();
        for like in &likes {
            *like_counts.entry(like.post_id).or_insert(0) += 1;
        }

        let mut visit_counts: HashMap<PostId, usize> = HashMap::new();
        for visit in &visits {
            *visit_counts.entry(visit.post_id).or_insert(0) += 1;
        }

        Self {
            users,
            posts,
            likes,
            visits,
            post_index,
            like_counts,
            visit_counts,
        }
    }

    pub fn post(&self, post_id: PostId) -> Option<&Post> {
        self.post_index.get(&post_id).map(|&idx| &self.posts[idx])
    }

    pub fn like_count(&self, post_id: PostId) -> usize {
        self.like_counts.get(&post_id).copied().unwrap_or(0)
    }

    pub fn visit_count(&self, post_id: PostId) -> usize {
        self.visit_counts.get(&post_id).copied().unwrap_or(0)
    }

    /// Likes plus visits across the whole store
    pub fn interaction_count(&self) -> usize {
        self.likes.len() + self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Recommendation card for a post, hydrated with its counters
    pub fn summary(&self, post_id: PostId) -> Option<PostSummary> {
        self.post(post_id).map(|post| PostSummary {
            id: post.id,
            title: post.title.clone(),
            category: post.category.clone(),
            like_count: self.like_count(post.id),
            visit_count: self.visit_count(post.id),
            score: None,
            reason: None,
        })
    }
}

/// Serialized form of an in-memory store, used for seed files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<UserId>,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub likes: Vec<Like>,
    #[serde(default)]
    pub visits: Vec<Visit>,
}

/// Outcome of toggling a like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Created,
    Removed,
}

/// Thread-safe in-process store backing the service binary and tests
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<SeedData>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedData) -> Self {
        Self {
            data: RwLock::new(seed),
        }
    }

    /// Load a JSON seed file of the form `{users, posts, likes, visits}`
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let seed: SeedData = serde_json::from_str(&raw)?;

        info!(
            path = %path.display(),
            users = seed.users.len(),
            posts = seed.posts.len(),
            likes = seed.likes.len(),
            visits = seed.visits.len(),
            "Loaded seed data"
        );

        Ok(Self::from_seed(seed))
    }

    /// Swap the whole contents in one write
    pub fn replace_data(&self, seed: SeedData) {
        *self.write() = seed;
    }

    pub fn add_user(&self, user_id: UserId) -> Result<(), StoreError> {
        let mut data = self.write();
        if !data.users.contains(&user_id) {
            data.users.push(user_id);
        }
        Ok(())
    }

    pub fn add_post(&self, post: Post) -> Result<(), StoreError> {
        let mut data = self.write();
        data.posts.retain(|existing| existing.id != post.id);
        data.posts.push(post);
        Ok(())
    }

    pub fn has_post(&self, post_id: PostId) -> Result<bool, StoreError> {
        Ok(self.read().posts.iter().any(|post| post.id == post_id))
    }

    /// Like a post, or remove the like if the user already liked it
    pub fn toggle_like(&self, user_id: UserId, post_id: PostId) -> Result<LikeToggle, StoreError> {
        let mut data = self.write();
        let before = data.likes.len();
        data.likes
            .retain(|like| !(like.user_id == user_id && like.post_id == post_id));

        if data.likes.len() < before {
            return Ok(LikeToggle::Removed);
        }

        data.likes.push(Like {
            user_id,
            post_id,
            created_at: Utc::now(),
        });
        Ok(LikeToggle::Created)
    }

    pub fn record_visit(
        &self,
        post_id: PostId,
        user_id: Option<UserId>,
        ip_address: Option<String>,
    ) -> Result<(), StoreError> {
        self.write().visits.push(Visit {
            post_id,
            user_id,
            ip_address,
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, SeedData> {
        self.data.read()
    }

    fn write(&self) -> RwLockWriteGuard<'_, SeedData> {
        self.data.write()
    }
}

impl InteractionStore for InMemoryStore {
    fn list_users(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.read().users.clone())
    }

    fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        Ok(self.read().posts.clone())
    }

    fn list_likes(&self) -> Result<Vec<Like>, StoreError> {
        Ok(self.read().likes.clone())
    }

    fn list_visits(&self) -> Result<Vec<Visit>, StoreError> {
        Ok(self.read().visits.clone())
    }

    fn snapshot(&self) -> Result<InteractionSnapshot, StoreError> {
        let data = self.read();
        Ok(InteractionSnapshot::new(
            data.users.clone(),
            data.posts.clone(),
            data.likes.clone(),
            data.visits.clone(),
        ))
    }

    fn count_likes_for_post(&self, post_id: PostId) -> Result<usize, StoreError> {
        Ok(self
            .read()
            .likes
            .iter()
            .filter(|like| like.post_id == post_id)
            .count())
    }

    fn count_visits_for_post(&self, post_id: PostId) -> Result<usize, StoreError> {
        Ok(self
            .read()
            .visits
            .iter()
            .filter(|visit| visit.post_id == post_id)
            .count())
    }
}

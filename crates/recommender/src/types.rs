//! Domain types shared by the recommendation engine
//!
//! Posts, users, likes and visits are owned by the blog store; the engine only
//! reads them. `PostSummary` is what the engine hands back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type PostId = i64;

/// Blog post as seen by the recommender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    #[serde(default)]
    pub category: Option<String>,
    pub title: String,
    /// Length of the post body in characters
    #[serde(default)]
    pub content_length: usize,
    pub created_at: DateTime<Utc>,
}

/// A user liking a post. At most one per (user, post) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub user_id: UserId,
    pub post_id: PostId,
    pub created_at: DateTime<Utc>,
}

/// A post visit, either by a signed-in user or an anonymous visitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub post_id: PostId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Only used to group anonymous visits, never for ownership
    #[serde(default)]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Recommendation card returned to the serving layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
    pub category: Option<String>,
    pub like_count: usize,
    pub visit_count: usize,
    /// Final score or similarity, when the producing stage has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PostSummary {
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

//! Similarity between posts
//!
//! Two signals are supported:
//! - feature vectors: category one-hot block followed by min-max normalized
//!   title and content lengths, compared with cosine similarity
//! - co-interaction: the number of users two posts have in common

use crate::types::{Like, Post, PostId, UserId, Visit};
use std::collections::{BTreeSet, HashMap};

/// Cosine similarity clamped to [-1, 1]
///
/// Mismatched lengths and zero vectors have similarity 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Rank candidates by descending similarity to `target`, ties by ascending id
pub fn rank_by_similarity<'a, I>(target: &[f64], candidates: I) -> Vec<(PostId, f64)>
where
    I: IntoIterator<Item = (PostId, &'a [f64])>,
{
    let mut ranked: Vec<(PostId, f64)> = candidates
        .into_iter()
        .map(|(id, vector)| (id, cosine_similarity(target, vector)))
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}

/// Min-max normalize a column of values into [0, 1]
///
/// A constant column maps to all zeros.
fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    values
        .iter()
        .map(|v| if range > 0.0 { (v - min) / range } else { 0.0 })
        .collect()
}

/// Feature vectors for every post in a snapshot
#[derive(Debug, Clone, Default)]
pub struct PostFeatureSpace {
    /// One-hot dimensions, sorted lexically
    categories: Vec<String>,
    vectors: HashMap<PostId, Vec<f64>>,
}

impl PostFeatureSpace {
    /// Number of numeric features appended after the one-hot block
    pub const NUMERIC_FEATURES: usize = 2;

    pub fn build(posts: &[Post]) -> Self {
        let categories: Vec<String> = posts
            .iter()
            .filter_map(|post| post.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let title_lengths: Vec<f64> = posts
            .iter()
            .map(|post| post.title.chars().count() as f64)
            .collect();
        let content_lengths: Vec<f64> = posts
            .iter()
            .map(|post| post.content_length as f64)
            .collect();
        let title_norm = min_max_normalize(&title_lengths);
        let content_norm = min_max_normalize(&content_lengths);

        let dimension = categories.len() + Self::NUMERIC_FEATURES;
        let mut vectors = HashMap::with_capacity(posts.len());

        for (idx, post) in posts.iter().enumerate() {
            let mut vector = vec![0.0; dimension];
            if let Some(category) = &post.category {
                if let Ok(slot) = categories.binary_search(category) {
                    vector[slot] = 1.0;
                }
            }
            vector[categories.len()] = title_norm[idx];
            vector[categories.len() + 1] = content_norm[idx];
            vectors.insert(post.id, vector);
        }

        Self {
            categories,
            vectors,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn dimension(&self) -> usize {
        self.categories.len() + Self::NUMERIC_FEATURES
    }

    pub fn vector_for(&self, post_id: PostId) -> Option<&[f64]> {
        self.vectors.get(&post_id).map(Vec::as_slice)
    }

    /// Every other post ranked by similarity to `post_id`
    pub fn rank_similar(&self, post_id: PostId) -> Vec<(PostId, f64)> {
        let Some(target) = self.vector_for(post_id) else {
            return Vec::new();
        };

        rank_by_similarity(
            target,
            self.vectors
                .iter()
                .filter(|(&id, _)| id != post_id)
                .map(|(&id, vector)| (id, vector.as_slice())),
        )
    }
}

/// Users who interacted with each post, signed-in interactions only
#[derive(Debug, Clone, Default)]
pub struct CoInteractionIndex {
    interactors: HashMap<PostId, BTreeSet<UserId>>,
}

impl CoInteractionIndex {
    pub fn build(likes: &[Like], visits: &[Visit]) -> Self {
        let mut interactors: HashMap<PostId, BTreeSet<UserId>> = HashMap::new();

        for like in likes {
            interactors
                .entry(like.post_id)
                .or_default()
                .insert(like.user_id);
        }
        for visit in visits {
            if let Some(user_id) = visit.user_id {
                interactors
                    .entry(visit.post_id)
                    .or_default()
                    .insert(user_id);
            }
        }

        Self { interactors }
    }

    pub fn interactors(&self, post_id: PostId) -> Option<&BTreeSet<UserId>> {
        self.interactors.get(&post_id)
    }

    /// Number of users who interacted with both posts
    pub fn overlap(&self, a: PostId, b: PostId) -> usize {
        match (self.interactors.get(&a), self.interactors.get(&b)) {
            (Some(set_a), Some(set_b)) => set_a.intersection(set_b).count(),
            _ => 0,
        }
    }

    /// Posts sharing at least one user with `post_id`, by overlap then id
    pub fn rank_overlapping(&self, post_id: PostId) -> Vec<(PostId, usize)> {
        let Some(target) = self.interactors.get(&post_id) else {
            return Vec::new();
        };

        let mut ranked: Vec<(PostId, usize)> = self
            .interactors
            .iter()
            .filter(|(&id, _)| id != post_id)
            .map(|(&id, users)| (id, target.intersection(users).count()))
            .filter(|&(_, overlap)| overlap > 0)
            .collect();

        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

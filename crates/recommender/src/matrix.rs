//! User × post interaction matrix
//!
//! Rows are users, columns are posts, both ordered by ascending id so that the
//! same snapshot always yields the same matrix. Only signed-in interactions count;
//! anonymous visits are handled by the visitor fallback instead.

use crate::types::{Like, PostId, UserId, Visit};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Cell weights for the interaction matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionWeights {
    /// Added once when the user liked the post
    pub like: f64,
    /// Added for every visit by the user
    pub visit: f64,
}

impl Default for InteractionWeights {
    fn default() -> Self {
        Self {
            like: 2.0,
            visit: 1.0,
        }
    }
}

/// Dense interaction matrix with its row and column id indexes
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMatrix {
    /// [num_users x num_posts]
    pub values: Array2<f64>,
    /// Sorted, deduplicated user ids, one per row
    pub user_ids: Vec<UserId>,
    /// Sorted, deduplicated post ids, one per column
    pub post_ids: Vec<PostId>,
}

impl InteractionMatrix {
    /// Build the matrix from likes and visits
    pub fn build(likes: &[Like], visits: &[Visit], weights: InteractionWeights) -> Self {
        let mut user_ids: Vec<UserId> = likes
            .iter()
            .map(|like| like.user_id)
            .chain(visits.iter().filter_map(|visit| visit.user_id))
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let mut post_ids: Vec<PostId> = likes
            .iter()
            .map(|like| like.post_id)
            .chain(
                visits
                    .iter()
                    .filter(|visit| visit.user_id.is_some())
                    .map(|visit| visit.post_id),
            )
            .collect();
        post_ids.sort_unstable();
        post_ids.dedup();

        let mut values = Array2::<f64>::zeros((user_ids.len(), post_ids.len()));

        // Both indexes were built from these same edges, so lookups cannot miss
        for like in likes {
            if let (Ok(row), Ok(col)) = (
                user_ids.binary_search(&like.user_id),
                post_ids.binary_search(&like.post_id),
            ) {
                values[[row, col]] += weights.like;
            }
        }

        for visit in visits {
            let Some(user_id) = visit.user_id else {
                continue;
            };
            if let (Ok(row), Ok(col)) = (
                user_ids.binary_search(&user_id),
                post_ids.binary_search(&visit.post_id),
            ) {
                values[[row, col]] += weights.visit;
            }
        }

        Self {
            values,
            user_ids,
            post_ids,
        }
    }

    pub fn row_of(&self, user_id: UserId) -> Option<usize> {
        self.user_ids.binary_search(&user_id).ok()
    }

    pub fn column_of(&self, post_id: PostId) -> Option<usize> {
        self.post_ids.binary_search(&post_id).ok()
    }

    pub fn get(&self, user_id: UserId, post_id: PostId) -> f64 {
        match (self.row_of(user_id), self.column_of(post_id)) {
            (Some(row), Some(col)) => self.values[[row, col]],
            _ => 0.0,
        }
    }

    pub fn user_row(&self, user_id: UserId) -> Option<ArrayView1<'_, f64>> {
        self.row_of(user_id).map(|row| self.values.row(row))
    }

    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn num_posts(&self) -> usize {
        self.post_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//! Hybrid scoring and cascading fallbacks
//!
//! Personalized ranking combines the SVD-smoothed affinity for each unseen post
//! with a bonus for the user's preferred categories. Whenever a stage cannot fill
//! the requested slots the policy falls through to a more generic one: category
//! recency, then global popularity.

use crate::factorization::{FactorizationEngine, SvdConfig};
use crate::matrix::{InteractionMatrix, InteractionWeights};
use crate::similarity::{CoInteractionIndex, PostFeatureSpace};
use crate::store::InteractionSnapshot;
use crate::types::{Post, PostId, PostSummary, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

const POPULAR_REASON: &str = "Popular with readers";

/// Where the category bonus count starts for the least preferred category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryRankBase {
    /// Least preferred category gets a bonus of 0
    ZeroIndexed,
    /// Least preferred category gets `scale / total`
    OneIndexed,
}

/// Weights and thresholds for the scoring policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Interaction matrix cell weights (default: like 2, visit 1)
    pub interaction_weights: InteractionWeights,
    /// Category preference weight per like (default: 3)
    pub category_like_weight: f64,
    /// Category preference weight per visit (default: 1)
    pub category_visit_weight: f64,
    /// Bonus given to the most preferred category (default: 5)
    pub category_bonus_scale: f64,
    pub category_rank_base: CategoryRankBase,
    /// Categories considered when scoring a user (default: 5)
    pub max_preferred_categories: usize,
    /// Popularity weight per like (default: 2)
    pub popularity_like_weight: f64,
    /// Popularity weight per visit (default: 1)
    pub popularity_visit_weight: f64,
    /// Co-interaction similarity only runs above this many interactions (default: 10)
    pub co_interaction_min_interactions: usize,
    pub svd: SvdConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            interaction_weights: InteractionWeights::default(),
            category_like_weight: 3.0,
            category_visit_weight: 1.0,
            category_bonus_scale: 5.0,
            category_rank_base: CategoryRankBase::OneIndexed,
            max_preferred_categories: 5,
            popularity_like_weight: 2.0,
            popularity_visit_weight: 1.0,
            co_interaction_min_interactions: 10,
            svd: SvdConfig::default(),
        }
    }
}

/// A category and how strongly a user leans towards it
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPreference {
    pub category: String,
    pub weight: f64,
}

/// Stages of the similar-posts cascade, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityStage {
    CoInteraction,
    FeatureVector,
    SameCategory,
    MostRecent,
}

impl SimilarityStage {
    pub const CASCADE: [SimilarityStage; 4] = [
        SimilarityStage::CoInteraction,
        SimilarityStage::FeatureVector,
        SimilarityStage::SameCategory,
        SimilarityStage::MostRecent,
    ];
}

impl fmt::Display for SimilarityStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimilarityStage::CoInteraction => "co_interaction",
            SimilarityStage::FeatureVector => "feature_vector",
            SimilarityStage::SameCategory => "same_category",
            SimilarityStage::MostRecent => "most_recent",
        };
        f.write_str(name)
    }
}

/// Result of one cascade stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Sufficient(Vec<PostSummary>),
    Insufficient,
}

/// Ranking policy over an interaction snapshot
#[derive(Debug, Clone, Default)]
pub struct ScoringPolicy {
    config: ScoringConfig,
    factorization: FactorizationEngine,
}

impl ScoringPolicy {
    pub fn new(config: ScoringConfig) -> Self {
        let factorization = FactorizationEngine::new(config.svd.clone());
        Self {
            config,
            factorization,
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Personalized recommendations for a signed-in user
    pub fn recommendations_for_user(
        &self,
        snapshot: &InteractionSnapshot,
        user_id: UserId,
        n: usize,
    ) -> Vec<PostSummary> {
        if n == 0 {
            return Vec::new();
        }

        let interacted = Self::interacted_posts(snapshot, user_id);
        if interacted.is_empty() {
            debug!(user_id, "No interaction history, using popular posts");
            return self.popular_posts(snapshot, n);
        }

        let preferences = self.category_preferences(snapshot, user_id);
        let mut selected = self.matrix_candidates(snapshot, user_id, &interacted, &preferences, n);

        if selected.len() < n {
            let categories: Vec<&str> = preferences.iter().map(|p| p.category.as_str()).collect();
            Self::fill_from_categories(snapshot, &categories, &interacted, &mut selected, n, |c| {
                format!("Because you read posts in {}", c)
            });
            self.pad_with_popular(snapshot, &interacted, &mut selected, n);
        }

        selected.truncate(n);
        selected
    }

    /// Posts similar to `post_id`, first cascade stage with enough candidates wins
    pub fn similar_posts(
        &self,
        snapshot: &InteractionSnapshot,
        post_id: PostId,
        n: usize,
    ) -> Vec<PostSummary> {
        let Some(target) = snapshot.post(post_id) else {
            debug!(post_id, "Unknown post, no similar posts");
            return Vec::new();
        };

        let available = snapshot.posts.len().saturating_sub(1);
        let needed = n.min(available);
        if needed == 0 {
            return Vec::new();
        }

        for stage in SimilarityStage::CASCADE {
            match self.run_similarity_stage(stage, snapshot, target, n, needed) {
                StageOutcome::Sufficient(results) => {
                    debug!(post_id, %stage, results = results.len(), "Similarity stage selected");
                    return results;
                }
                StageOutcome::Insufficient => {
                    debug!(post_id, %stage, "Similarity stage insufficient");
                }
            }
        }

        Vec::new()
    }

    /// Run a single stage of the similar-posts cascade
    pub fn run_similarity_stage(
        &self,
        stage: SimilarityStage,
        snapshot: &InteractionSnapshot,
        target: &Post,
        n: usize,
        needed: usize,
    ) -> StageOutcome {
        let candidates: Vec<PostSummary> = match stage {
            SimilarityStage::CoInteraction => {
                if snapshot.interaction_count() <= self.config.co_interaction_min_interactions {
                    return StageOutcome::Insufficient;
                }
                let index = CoInteractionIndex::build(&snapshot.likes, &snapshot.visits);
                index
                    .rank_overlapping(target.id)
                    .into_iter()
                    .filter_map(|(id, overlap)| {
                        snapshot
                            .summary(id)
                            .map(|s| s.with_score(overlap as f64))
                    })
                    .take(n)
                    .collect()
            }
            SimilarityStage::FeatureVector => {
                let space = PostFeatureSpace::build(&snapshot.posts);
                space
                    .rank_similar(target.id)
                    .into_iter()
                    .filter(|&(_, similarity)| similarity > 0.0)
                    .filter_map(|(id, similarity)| {
                        snapshot.summary(id).map(|s| s.with_score(similarity))
                    })
                    .take(n)
                    .collect()
            }
            SimilarityStage::SameCategory => {
                let Some(category) = target.category.as_deref() else {
                    return StageOutcome::Insufficient;
                };
                snapshot
                    .posts
                    .iter()
                    .filter(|post| post.id != target.id)
                    .filter(|post| post.category.as_deref() == Some(category))
                    .filter_map(|post| snapshot.summary(post.id))
                    .take(n)
                    .collect()
            }
            SimilarityStage::MostRecent => {
                let mut others: Vec<&Post> = snapshot
                    .posts
                    .iter()
                    .filter(|post| post.id != target.id)
                    .collect();
                Self::sort_newest_first(&mut others);
                let recent = others
                    .into_iter()
                    .filter_map(|post| snapshot.summary(post.id))
                    .take(n)
                    .collect();
                return StageOutcome::Sufficient(recent);
            }
        };

        if candidates.len() >= needed {
            StageOutcome::Sufficient(candidates)
        } else {
            StageOutcome::Insufficient
        }
    }

    /// Top `n` posts by weighted likes and visits
    pub fn popular_posts(&self, snapshot: &InteractionSnapshot, n: usize) -> Vec<PostSummary> {
        self.popularity_ranking(snapshot)
            .into_iter()
            .take(n)
            .filter_map(|(id, score)| snapshot.summary(id).map(|s| s.with_score(score)))
            .collect()
    }

    /// Recommendations for a visitor known only by IP address
    pub fn recommendations_for_anonymous(
        &self,
        snapshot: &InteractionSnapshot,
        ip_address: &str,
        n: usize,
    ) -> Vec<PostSummary> {
        if n == 0 {
            return Vec::new();
        }

        let mut visited: HashSet<PostId> = HashSet::new();
        let mut category_counts: HashMap<&str, usize> = HashMap::new();

        for visit in snapshot
            .visits
            .iter()
            .filter(|visit| visit.ip_address.as_deref() == Some(ip_address))
        {
            visited.insert(visit.post_id);
            if let Some(category) = snapshot
                .post(visit.post_id)
                .and_then(|post| post.category.as_deref())
            {
                *category_counts.entry(category).or_insert(0) += 1;
            }
        }

        if visited.is_empty() {
            debug!(ip_address, "No visit history, using popular posts");
            return self.popular_posts(snapshot, n);
        }

        let mut ranked: Vec<(&str, usize)> = category_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let categories: Vec<&str> = ranked.into_iter().map(|(c, _)| c).collect();

        let mut selected = Vec::new();
        Self::fill_from_categories(snapshot, &categories, &visited, &mut selected, n, |c| {
            format!("Because you viewed other posts in {}", c)
        });
        // Visited posts stay eligible here; only the category fill skips them
        self.pad_with_popular(snapshot, &HashSet::new(), &mut selected, n);

        selected.truncate(n);
        selected
    }

    /// Categories ranked by weighted likes and visits, ties by name
    pub fn category_preferences(
        &self,
        snapshot: &InteractionSnapshot,
        user_id: UserId,
    ) -> Vec<CategoryPreference> {
        let mut weights: HashMap<&str, f64> = HashMap::new();

        let liked = snapshot
            .likes
            .iter()
            .filter(|like| like.user_id == user_id)
            .map(|like| (like.post_id, self.config.category_like_weight));
        let visited = snapshot
            .visits
            .iter()
            .filter(|visit| visit.user_id == Some(user_id))
            .map(|visit| (visit.post_id, self.config.category_visit_weight));

        for (post_id, weight) in liked.chain(visited) {
            if let Some(category) = snapshot
                .post(post_id)
                .and_then(|post| post.category.as_deref())
            {
                *weights.entry(category).or_insert(0.0) += weight;
            }
        }

        let mut preferences: Vec<CategoryPreference> = weights
            .into_iter()
            .map(|(category, weight)| CategoryPreference {
                category: category.to_string(),
                weight,
            })
            .collect();

        preferences.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then_with(|| a.category.cmp(&b.category))
        });
        preferences.truncate(self.config.max_preferred_categories);
        preferences
    }

    /// Bonus for the category at `rank` (0 = most preferred) out of `total`
    pub fn category_bonus(&self, rank: usize, total: usize) -> f64 {
        if total == 0 || rank >= total {
            return 0.0;
        }

        let position_from_top = match self.config.category_rank_base {
            CategoryRankBase::OneIndexed => total - rank,
            CategoryRankBase::ZeroIndexed => total - rank - 1,
        };

        position_from_top as f64 / total as f64 * self.config.category_bonus_scale
    }

    /// All posts with their popularity score, best first
    fn popularity_ranking(&self, snapshot: &InteractionSnapshot) -> Vec<(PostId, f64)> {
        let mut ranked: Vec<(&Post, f64)> = snapshot
            .posts
            .iter()
            .map(|post| {
                let score = self.config.popularity_like_weight * snapshot.like_count(post.id) as f64
                    + self.config.popularity_visit_weight * snapshot.visit_count(post.id) as f64;
                (post, score)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| b.0.created_at.cmp(&a.0.created_at))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        ranked.into_iter().map(|(post, score)| (post.id, score)).collect()
    }

    /// Score unseen posts from the reconstructed matrix row plus category bonus
    fn matrix_candidates(
        &self,
        snapshot: &InteractionSnapshot,
        user_id: UserId,
        interacted: &HashSet<PostId>,
        preferences: &[CategoryPreference],
        n: usize,
    ) -> Vec<PostSummary> {
        let matrix = InteractionMatrix::build(
            &snapshot.likes,
            &snapshot.visits,
            self.config.interaction_weights,
        );

        let Some(row) = matrix.row_of(user_id) else {
            debug!(user_id, "User absent from interaction matrix");
            return Vec::new();
        };

        let reconstructed = self.factorization.reconstruct(&matrix.values);
        let affinities = reconstructed.row(row);
        let total = preferences.len();

        let mut scored: Vec<(PostSummary, f64)> = matrix
            .post_ids
            .iter()
            .enumerate()
            .filter(|(_, post_id)| !interacted.contains(*post_id))
            .filter_map(|(col, &post_id)| {
                let post = snapshot.post(post_id)?;
                let mut summary = snapshot.summary(post_id)?;

                let preferred = post.category.as_deref().and_then(|category| {
                    preferences
                        .iter()
                        .position(|p| p.category == category)
                        .map(|rank| (category, rank))
                });

                let bonus = match preferred {
                    Some((category, rank)) => {
                        summary = summary.with_reason(format!(
                            "Because you read posts in {}",
                            category
                        ));
                        self.category_bonus(rank, total)
                    }
                    None => 0.0,
                };

                let score = affinities[col] + bonus;
                Some((summary.with_score(score), score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.id.cmp(&b.0.id)));

        scored
            .into_iter()
            .take(n)
            .map(|(summary, _)| summary)
            .collect()
    }

    /// Posts the user liked or visited
    fn interacted_posts(snapshot: &InteractionSnapshot, user_id: UserId) -> HashSet<PostId> {
        snapshot
            .likes
            .iter()
            .filter(|like| like.user_id == user_id)
            .map(|like| like.post_id)
            .chain(
                snapshot
                    .visits
                    .iter()
                    .filter(|visit| visit.user_id == Some(user_id))
                    .map(|visit| visit.post_id),
            )
            .collect()
    }

    /// Fill remaining slots from categories in order, newest posts first
    fn fill_from_categories(
        snapshot: &InteractionSnapshot,
        categories: &[&str],
        excluded: &HashSet<PostId>,
        selected: &mut Vec<PostSummary>,
        n: usize,
        reason: impl Fn(&str) -> String,
    ) {
        for &category in categories {
            if selected.len() >= n {
                break;
            }

            let mut posts: Vec<&Post> = snapshot
                .posts
                .iter()
                .filter(|post| post.category.as_deref() == Some(category))
                .filter(|post| !excluded.contains(&post.id))
                .filter(|post| !selected.iter().any(|s| s.id == post.id))
                .collect();
            Self::sort_newest_first(&mut posts);

            let remaining = n - selected.len();
            for post in posts.into_iter().take(remaining) {
                if let Some(summary) = snapshot.summary(post.id) {
                    selected.push(summary.with_reason(reason(category)));
                }
            }
        }
    }

    /// Pad with globally popular posts not excluded or already selected
    fn pad_with_popular(
        &self,
        snapshot: &InteractionSnapshot,
        excluded: &HashSet<PostId>,
        selected: &mut Vec<PostSummary>,
        n: usize,
    ) {
        if selected.len() >= n {
            return;
        }

        for (post_id, score) in self.popularity_ranking(snapshot) {
            if selected.len() >= n {
                break;
            }
            if excluded.contains(&post_id) || selected.iter().any(|s| s.id == post_id) {
                continue;
            }
            if let Some(summary) = snapshot.summary(post_id) {
                selected.push(summary.with_score(score).with_reason(POPULAR_REASON));
            }
        }
    }

    fn sort_newest_first(posts: &mut [&Post]) {
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    }
}

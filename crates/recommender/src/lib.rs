//! Blog post recommendation engine
//!
//! Ranks posts for signed-in users and anonymous visitors from likes and visits:
//! a weighted user × post matrix smoothed by truncated SVD, a category bonus,
//! cosine and co-interaction similarity between posts, and popularity fallbacks.
//! Results are memoized in an epoch-TTL cache invalidated by write hooks.

pub mod cache;
pub mod config;
pub mod error;
pub mod factorization;
pub mod matrix;
pub mod scoring;
pub mod server;
pub mod service;
pub mod similarity;
pub mod store;
pub mod types;

// Re-export key types
pub use cache::{CacheKey, CachedRecommendations, Clock, RecommendationCache, SystemClock};
pub use config::{RecommenderConfig, ServerConfig, ServiceConfig};
pub use error::{FactorizationError, RecommenderError, StoreError};
pub use factorization::{FactorizationEngine, SvdConfig};
pub use matrix::{InteractionMatrix, InteractionWeights};
pub use scoring::{
    CategoryPreference, CategoryRankBase, ScoringConfig, ScoringPolicy, SimilarityStage,
    StageOutcome,
};
pub use service::RecommendationService;
pub use similarity::{cosine_similarity, rank_by_similarity, CoInteractionIndex, PostFeatureSpace};
pub use store::{InMemoryStore, InteractionSnapshot, InteractionStore, LikeToggle, SeedData};
pub use types::*;

#[cfg(test)]
mod tests;

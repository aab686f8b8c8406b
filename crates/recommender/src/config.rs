//! Configuration for the recommendation engine and its service binary
//!
//! `ServiceConfig::load` reads an optional `config/recommender` file and then
//! `RECOMMENDER__*` environment variables, e.g. `RECOMMENDER__SERVER__PORT=9000` or
//! `RECOMMENDER__RECOMMENDER__CACHE_TTL_SECS=60`.

use crate::error::RecommenderError;
use crate::scoring::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Engine tuning: scoring weights, cache TTL and default list size
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub scoring: ScoringConfig,

    /// Cache epoch lifetime in seconds (default: 600)
    pub cache_ttl_secs: u64,

    /// List size when the caller does not pass one (default: 5)
    pub default_limit: usize,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            cache_ttl_secs: 600,
            default_limit: 5,
        }
    }
}

impl RecommenderConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), RecommenderError> {
        let weights = &self.scoring.interaction_weights;
        if weights.like <= weights.visit {
            return Err(RecommenderError::configuration(
                format!(
                    "like weight ({}) must exceed visit weight ({})",
                    weights.like, weights.visit
                ),
                "RECOMMENDER__RECOMMENDER__SCORING__INTERACTION_WEIGHTS__LIKE",
            ));
        }

        if weights.visit < 0.0 {
            return Err(RecommenderError::configuration(
                "visit weight cannot be negative",
                "RECOMMENDER__RECOMMENDER__SCORING__INTERACTION_WEIGHTS__VISIT",
            ));
        }

        if self.scoring.svd.max_rank == 0 {
            return Err(RecommenderError::configuration(
                "max_rank must be greater than 0",
                "RECOMMENDER__RECOMMENDER__SCORING__SVD__MAX_RANK",
            ));
        }

        if self.cache_ttl_secs == 0 {
            return Err(RecommenderError::configuration(
                "cache_ttl_secs must be greater than 0",
                "RECOMMENDER__RECOMMENDER__CACHE_TTL_SECS",
            ));
        }

        if self.default_limit == 0 {
            return Err(RecommenderError::configuration(
                "default_limit must be greater than 0",
                "RECOMMENDER__RECOMMENDER__DEFAULT_LIMIT",
            ));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Service binary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,

    /// JSON seed file for the in-memory store
    pub seed_path: Option<PathBuf>,

    /// Default filter when `RUST_LOG` is unset
    pub log_level: String,

    pub recommender: RecommenderConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            seed_path: None,
            log_level: "info".to_string(),
            recommender: RecommenderConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from `.env`, the config file and the environment
    pub fn load() -> anyhow::Result<Self> {
        load_dotenv();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/recommender").required(false))
            .add_source(
                config::Environment::with_prefix("RECOMMENDER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RecommenderError> {
        if self.server.port == 0 {
            return Err(RecommenderError::configuration(
                "port must be greater than 0",
                "RECOMMENDER__SERVER__PORT",
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(RecommenderError::configuration(
                format!("unknown log level '{}'", self.log_level),
                "RECOMMENDER__LOG_LEVEL",
            ));
        }

        self.recommender.validate()
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

/// Load `.env` if present
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub store: StoreConfig,
    pub limits: RankingLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON seed for the in-memory store. Unset means start empty.
    pub seed_path: Option<String>,
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Fetch sizes for candidate batches, read from `RANKING_*` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingLimits {
    #[serde(default = "default_interaction_history")]
    pub interaction_history: usize,
    #[serde(default = "default_personalized_candidates")]
    pub personalized_candidates: usize,
    #[serde(default = "default_similarity_candidates")]
    pub similarity_candidates: usize,
    #[serde(default = "default_upvote_history")]
    pub upvote_history: usize,
    #[serde(default = "default_upvoted_profile_posts")]
    pub upvoted_profile_posts: usize,
    #[serde(default = "default_community_scan")]
    pub community_scan: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for RankingLimits {
    fn default() -> Self {
        Self {
            interaction_history: default_interaction_history(),
            personalized_candidates: default_personalized_candidates(),
            similarity_candidates: default_similarity_candidates(),
            upvote_history: default_upvote_history(),
            upvoted_profile_posts: default_upvoted_profile_posts(),
            community_scan: default_community_scan(),
            max_limit: default_max_limit(),
        }
    }
}

impl RankingLimits {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("RANKING_").from_env()
    }

    /// Clamp a requested page size into `1..=max_limit`.
    pub fn clamp(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_limit.max(1))
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: std::env::var("APP_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .context("APP_PORT must be a valid port")?,
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            store: StoreConfig {
                seed_path: std::env::var("SEED_PATH").ok().filter(|p| !p.is_empty()),
                timeout_ms: match std::env::var("STORE_TIMEOUT_MS") {
                    Ok(raw) => raw
                        .parse()
                        .context("STORE_TIMEOUT_MS must be a number of milliseconds")?,
                    Err(_) => default_store_timeout_ms(),
                },
            },
            limits: RankingLimits::from_env().context("invalid RANKING_* setting")?,
        })
    }
}

fn default_store_timeout_ms() -> u64 {
    2000
}

fn default_interaction_history() -> usize {
    500
}

fn default_personalized_candidates() -> usize {
    200
}

fn default_similarity_candidates() -> usize {
    100
}

fn default_upvote_history() -> usize {
    50
}

fn default_upvoted_profile_posts() -> usize {
    10
}

fn default_community_scan() -> usize {
    100
}

fn default_max_limit() -> usize {
    100
}

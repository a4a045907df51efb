//! Configuration module for matching-service.

use crate::services::policy::{DecisionThresholds, SignalWeights};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub scoring: ScoringConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// External embedding provider. `provider = "mock"` selects the
/// deterministic in-process provider (local runs and tests).
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Nearest-neighbor shortlist size.
    pub top_k: usize,
    /// Deterministic pre-filter window around the document date, in days.
    pub date_window_days: i32,
    /// Hard cap on the unioned candidate set.
    pub candidate_cap: usize,
    pub index_timeout_secs: u64,
}

impl RetrievalConfig {
    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index_timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub weights: SignalWeights,
    pub thresholds: DecisionThresholds,
    /// Decay window for the date signal, in days.
    pub date_decay_days: i64,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub enabled: bool,
    pub worker_count: usize,
    pub queue_size: usize,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl MatchingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "matching-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: env_parse("DATABASE_MIN_CONNECTIONS", 2),
            },
            embedding: EmbeddingConfig {
                provider: env::var("EMBEDDING_PROVIDER").unwrap_or_else(|_| "http".to_string()),
                url: env::var("EMBEDDING_SERVICE_URL")
                    .unwrap_or_else(|_| "http://embedding-service:3001".to_string()),
                api_key: env::var("EMBEDDING_API_KEY").ok(),
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                dimension: env_parse("EMBEDDING_DIMENSION", 256),
                timeout_secs: env_parse("EMBEDDING_TIMEOUT_SECS", 10),
            },
            retrieval: RetrievalConfig {
                top_k: env_parse("RETRIEVAL_TOP_K", 20),
                date_window_days: env_parse("RETRIEVAL_DATE_WINDOW_DAYS", 7),
                candidate_cap: env_parse("RETRIEVAL_CANDIDATE_CAP", 50),
                index_timeout_secs: env_parse("RETRIEVAL_INDEX_TIMEOUT_SECS", 5),
            },
            scoring: ScoringConfig {
                weights: SignalWeights {
                    embedding: env_parse("SCORING_WEIGHT_EMBEDDING", 0.50),
                    amount: env_parse("SCORING_WEIGHT_AMOUNT", 0.35),
                    currency: env_parse("SCORING_WEIGHT_CURRENCY", 0.05),
                    date: env_parse("SCORING_WEIGHT_DATE", 0.05),
                    name: env_parse("SCORING_WEIGHT_NAME", 0.05),
                },
                thresholds: DecisionThresholds {
                    auto: env_parse("SCORING_AUTO_THRESHOLD", 0.95),
                    high: env_parse("SCORING_HIGH_THRESHOLD", 0.75),
                    suggest: env_parse("SCORING_SUGGEST_THRESHOLD", 0.40),
                },
                date_decay_days: env_parse("SCORING_DATE_DECAY_DAYS", 14),
            },
            worker: WorkerConfig {
                enabled: env_parse("WORKER_ENABLED", true),
                worker_count: env_parse("WORKER_COUNT", 4),
                queue_size: env_parse("WORKER_QUEUE_SIZE", 256),
            },
        })
    }
}

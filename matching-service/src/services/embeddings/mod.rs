//! Embedding provider abstractions and implementations.
//!
//! Trait-based so the backing model service can be swapped without touching
//! the scoring pipeline. The engine treats every provider as fallible and
//! possibly slow; a failed call degrades the run instead of failing it.

pub mod http;
pub mod mock;

use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Error type for embedding provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Trait for text embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a piece of text into a fixed-length vector.
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>, ProviderError>;

    /// Provider label used in logs and metrics.
    fn name(&self) -> &'static str;
}

/// Build the provider selected by configuration.
pub fn provider_from_config(config: &EmbeddingConfig) -> Arc<dyn EmbeddingProvider> {
    match config.provider.as_str() {
        "mock" => Arc::new(mock::MockEmbeddingProvider::new(config.dimension)),
        _ => Arc::new(http::HttpEmbeddingProvider::new(config.clone())),
    }
}

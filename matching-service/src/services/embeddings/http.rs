//! HTTP embedding provider.
//!
//! Talks to an external embedding service over its JSON API. The request
//! timeout is explicit: a slow provider degrades the scoring run, it never
//! stalls it.

use super::{EmbeddingProvider, ProviderError};
use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use service_core::observability::inject_trace_headers;

pub struct HttpEmbeddingProvider {
    config: EmbeddingConfig,
    client: Client,
}

impl HttpEmbeddingProvider {
    pub fn new(config: EmbeddingConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn api_url(&self) -> String {
        format!("{}/v1/embeddings", self.config.url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>, ProviderError> {
        if text.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("empty input text".into()));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        inject_trace_headers(&mut headers, None);

        let mut request = self
            .client
            .post(self.api_url())
            .headers(headers)
            .json(&EmbeddingRequest { model, input: text });

        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::NetworkError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "embedding service returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("malformed response: {}", e)))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::ApiError("response contained no embedding".into()))?;

        if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
            return Err(ProviderError::ApiError(
                "embedding vector is empty or non-finite".into(),
            ));
        }

        Ok(vector)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

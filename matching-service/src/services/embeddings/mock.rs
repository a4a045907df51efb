//! Deterministic mock embedding provider.
//!
//! Hashes each token of the input into a pseudo-random direction and sums
//! the directions, so texts sharing vocabulary produce correlated vectors
//! and identical token bags produce identical directions. No network, no
//! model; used for local runs and tests.

use super::{EmbeddingProvider, ProviderError};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(8),
        }
    }

    fn token_direction(&self, token: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let mut state = hasher.finish();

        (0..self.dimension)
            .map(|_| {
                state = splitmix64(state);
                // Map to [-1, 1)
                (state >> 11) as f32 / (1u64 << 52) as f32 - 1.0
            })
            .collect()
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str, _model: &str) -> Result<Vec<f32>, ProviderError> {
        let tokens: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect();

        if tokens.is_empty() {
            return Err(ProviderError::InvalidRequest("empty input text".into()));
        }

        let mut vector = vec![0.0f32; self.dimension];
        for token in &tokens {
            for (acc, component) in vector.iter_mut().zip(self.token_direction(token)) {
                *acc += component;
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}


use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::EmbeddingConfig;
use crate::{Result, SeedError};

/// Output dimension of the default model (all-minilm / MiniLM-L6-v2)
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Blocking HTTP client for an Ollama-compatible embedding endpoint.
///
/// The model is fixed for the lifetime of the client, so identical input
/// text always yields the identical vector within a run.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    base_url: Url,
    model: String,
    dimension: usize,
    input_word_budget: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|_| SeedError::Config(format!("invalid embedding URL: {}", config.url)))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.model.clone(),
            dimension: config.dimension,
            input_word_budget: config.input_word_budget,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// The dimension every returned vector is verified against.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Generate the embedding vector for a chunk of text.
    ///
    /// Input longer than the configured word budget is truncated
    /// deterministically before encoding. Any transport failure, non-success
    /// status, or malformed response is a [`SeedError::Model`], fatal to the
    /// run since there is no partial-record fallback. A vector of the wrong
    /// length is also fatal: the target index is dimension-typed.
    #[inline]
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let truncated = truncate_words(text, self.input_word_budget);
        debug!(
            "Embedding text ({} chars, budget {} words)",
            truncated.len(),
            self.input_word_budget
        );

        let request = EmbedRequest {
            model: self.model.clone(),
            prompt: truncated,
        };

        let url = self
            .base_url
            .join("/api/embed")
            .map_err(|e| SeedError::Model(format!("failed to build embedding URL: {}", e)))?;

        let request_json = serde_json::to_string(&request)
            .map_err(|e| SeedError::Model(format!("failed to serialize request: {}", e)))?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| SeedError::Model(format!("embedding request failed: {}", e)))?;

        let embed_response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| SeedError::Model(format!("failed to parse embedding response: {}", e)))?;

        if embed_response.embedding.len() != self.dimension {
            return Err(SeedError::Model(format!(
                "model returned a {}-dimensional vector, expected {}",
                embed_response.embedding.len(),
                self.dimension
            )));
        }

        Ok(embed_response.embedding)
    }
}

/// Keep at most `budget` leading words, rejoined with single spaces.
///
/// Deterministic, and an identity for text that is already
/// space-normalized and within budget (which pipeline chunks are).
fn truncate_words(text: &str, budget: usize) -> String {
    text.split_whitespace()
        .take(budget)
        .collect::<Vec<_>>()
        .join(" ")
}

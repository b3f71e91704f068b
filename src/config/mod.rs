#[cfg(test)]
mod tests;

use std::env;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chunking::ChunkingConfig;
use crate::embeddings::DEFAULT_EMBEDDING_DIMENSION;
use crate::store::DistanceMetric;
use crate::{Result, SeedError};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Top-level application configuration, sourced from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Maximum number of records per upsert call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Connection parameters for the vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// LanceDB URI: a local path/`file://` URI or a remote `db://` URI
    pub uri: String,
    /// Credential for remote stores
    pub api_key: Option<String>,
    /// Deployment region for remote stores
    pub region: Option<String>,
    /// Name of the target index (table)
    pub index_name: String,
    /// Similarity metric declared at index creation
    #[serde(default)]
    pub metric: DistanceMetric,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding server
    pub url: String,
    pub model: String,
    /// Output vector dimension; must match the index's declared dimension
    pub dimension: usize,
    /// Maximum number of words fed to the model; longer inputs are
    /// truncated, not rejected
    pub input_word_budget: usize,
}

impl Default for EmbeddingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            input_word_budget: 512,
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is honored if present.
    /// `PDFSEED_DB_URI` and `PDFSEED_INDEX_NAME` are required; everything
    /// else falls back to defaults. Fails before any document is touched so
    /// a misconfigured run has no side effects.
    #[inline]
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let uri = require_var("PDFSEED_DB_URI")?;
        let index_name = require_var("PDFSEED_INDEX_NAME")?;

        let mut embedding = EmbeddingConfig::default();
        if let Ok(url) = env::var("PDFSEED_EMBEDDING_URL") {
            embedding.url = url;
        }
        if let Ok(model) = env::var("PDFSEED_EMBEDDING_MODEL") {
            embedding.model = model;
        }
        if let Some(dimension) = parse_var("PDFSEED_EMBEDDING_DIMENSION")? {
            embedding.dimension = dimension;
        }

        let metric = match env::var("PDFSEED_METRIC") {
            Ok(value) => value.parse()?,
            Err(_) => DistanceMetric::default(),
        };

        let config = Self {
            store: StoreConfig {
                uri,
                api_key: env::var("PDFSEED_API_KEY").ok(),
                region: env::var("PDFSEED_REGION").ok(),
                index_name,
                metric,
            },
            embedding,
            chunking: ChunkingConfig::default(),
            batch_size: parse_var("PDFSEED_BATCH_SIZE")?.unwrap_or(DEFAULT_BATCH_SIZE),
        };

        config.validate()?;
        Ok(config)
    }

    #[inline]
    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.embedding.validate()?;
        self.chunking.validate()?;

        if self.batch_size == 0 {
            return Err(SeedError::Config(
                "batch size must be greater than zero".to_string(),
            ));
        }

        // Chunks already stay within the embedding input budget, so
        // truncation never fires on pipeline-produced text. The two limits
        // stay independent but are validated consistent here.
        if self.embedding.input_word_budget < self.chunking.max_words {
            return Err(SeedError::Config(format!(
                "embedding input budget ({} words) is smaller than max_words ({}); \
                 chunks would be silently truncated",
                self.embedding.input_word_budget, self.chunking.max_words
            )));
        }

        Ok(())
    }
}

impl StoreConfig {
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            return Err(SeedError::Config("store URI cannot be empty".to_string()));
        }
        if self.index_name.trim().is_empty() {
            return Err(SeedError::Config("index name cannot be empty".to_string()));
        }

        // Remote LanceDB deployments authenticate with a key and region;
        // local file URIs need neither.
        if self.is_remote() {
            if self.api_key.as_deref().is_none_or(str::is_empty) {
                return Err(SeedError::Config(
                    "PDFSEED_API_KEY is required for remote db:// stores".to_string(),
                ));
            }
            if self.region.as_deref().is_none_or(str::is_empty) {
                return Err(SeedError::Config(
                    "PDFSEED_REGION is required for remote db:// stores".to_string(),
                ));
            }
        }

        Ok(())
    }

    #[inline]
    pub fn is_remote(&self) -> bool {
        self.uri.starts_with("db://")
    }
}

impl EmbeddingConfig {
    #[inline]
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.url)
            .map_err(|_| SeedError::Config(format!("invalid embedding URL: {}", self.url)))?;

        if self.model.trim().is_empty() {
            return Err(SeedError::Config("model name cannot be empty".to_string()));
        }

        if !(64..=4096).contains(&self.dimension) {
            return Err(SeedError::Config(format!(
                "invalid embedding dimension: {} (must be between 64 and 4096)",
                self.dimension
            )));
        }

        if self.input_word_budget == 0 {
            return Err(SeedError::Config(
                "embedding input budget must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn require_var(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SeedError::Config(format!(
            "required environment variable {} is not set",
            name
        ))),
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| SeedError::Config(format!("invalid value for {}: {}", name, value))),
        Err(_) => Ok(None),
    }
}

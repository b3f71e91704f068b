use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SeedError>;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Document not found: {0}")]
    DocumentNotFound(PathBuf),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding model error: {0}")]
    Model(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Index configuration error: {0}")]
    IndexConfig(String),

    #[error("Failed to write batch {batch} (records {start}..{end}): {message}")]
    IndexWrite {
        batch: usize,
        start: usize,
        end: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod extractor;
pub mod pipeline;
pub mod store;


use std::path::Path;

use tracing::{debug, info};

use crate::Result;
use crate::chunking::chunk_words;
use crate::config::Config;
use crate::embeddings::EmbeddingClient;
use crate::extractor::{Page, extract_pages};
use crate::store::{EmbeddingRecord, RecordMetadata, VectorStore};

/// Counters describing a completed seeding run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedStats {
    pub pages: usize,
    pub chunks: usize,
    pub batches: usize,
}

/// Orchestrates one document through extract → chunk → embed → upsert.
///
/// Collaborators are injected so the pipeline can be driven against fake
/// endpoints and throwaway stores in tests. Execution is strictly
/// sequential: every embedding for the document is accumulated in memory
/// before the first write, and writes happen in document order.
pub struct Seeder {
    config: Config,
    embedder: EmbeddingClient,
    store: VectorStore,
}

impl Seeder {
    #[inline]
    pub fn new(config: Config, embedder: EmbeddingClient, store: VectorStore) -> Self {
        Self {
            config,
            embedder,
            store,
        }
    }

    /// Seed one document into the index.
    ///
    /// A missing document fails before any index side effect. An embedding
    /// failure discards the in-memory accumulation. A write failure leaves
    /// batches written before it committed; the error names the failing
    /// batch so callers know how far the run got.
    #[inline]
    pub async fn run(&mut self, document: &Path) -> Result<SeedStats> {
        self.config.validate()?;

        let pages = extract_pages(document)?;
        self.seed_pages(&pages).await
    }

    /// Seed already-extracted pages.
    #[inline]
    pub async fn seed_pages(&mut self, pages: &[Page]) -> Result<SeedStats> {
        let records = self.collect_records(pages)?;

        let mut stats = SeedStats {
            pages: pages.len(),
            chunks: records.len(),
            batches: 0,
        };

        if records.is_empty() {
            info!("Document produced no chunks; nothing to write");
            return Ok(stats);
        }

        self.store.ensure_index(self.embedder.dimension()).await?;
        stats.batches = self
            .store
            .upsert(&records, self.config.batch_size)
            .await?;

        info!(
            "Seeded {} chunks from {} pages in {} batches",
            stats.chunks, stats.pages, stats.batches
        );

        Ok(stats)
    }

    /// Chunk and embed every page, in document order.
    fn collect_records(&self, pages: &[Page]) -> Result<Vec<EmbeddingRecord>> {
        let mut records = Vec::new();

        for page in pages {
            let chunks = chunk_words(&page.text, &self.config.chunking)?;
            debug!("Page {} produced {} chunks", page.id(), chunks.len());

            for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                let vector = self.embedder.embed(&chunk)?;
                records.push(EmbeddingRecord {
                    id: record_id(page, chunk_index),
                    vector,
                    metadata: RecordMetadata {
                        page: page.id(),
                        text: chunk,
                    },
                });
            }
        }

        Ok(records)
    }

    /// Access the underlying store, for post-run inspection.
    #[inline]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }
}

/// Deterministic record identifier: re-seeding an unchanged document
/// produces the same ids, so writes overwrite instead of duplicating.
fn record_id(page: &Page, chunk_index: usize) -> String {
    format!("{}_chunk_{}", page.id(), chunk_index)
}

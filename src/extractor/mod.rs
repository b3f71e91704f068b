
use std::path::Path;

use tracing::{debug, info};

use crate::{Result, SeedError};

/// Plain text extracted from one PDF page.
///
/// Transient: pages exist only long enough to be chunked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number in the source document
    pub number: usize,
    /// Whitespace-normalized page text
    pub text: String,
}

impl Page {
    /// Stable page identifier used as the prefix of record ids.
    #[inline]
    pub fn id(&self) -> String {
        format!("page_{}", self.number)
    }
}

/// Extract per-page plain text from a PDF document.
///
/// Fails with [`SeedError::DocumentNotFound`] before opening the file if the
/// path does not exist, so a bad path has no side effects. Pages whose text
/// is empty after normalization (image-only pages, blank separators) are
/// dropped; surviving pages keep their original 1-based numbers.
#[inline]
pub fn extract_pages(path: &Path) -> Result<Vec<Page>> {
    if !path.exists() {
        return Err(SeedError::DocumentNotFound(path.to_path_buf()));
    }

    debug!("Extracting text from {}", path.display());

    let raw_pages = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| SeedError::Extraction(format!("failed to read {}: {}", path.display(), e)))?;

    let pages = pages_from_raw(raw_pages);

    info!(
        "Extracted {} non-empty pages from {}",
        pages.len(),
        path.display()
    );

    Ok(pages)
}

/// Normalize raw page texts into [`Page`]s, dropping blank pages.
fn pages_from_raw(raw_pages: Vec<String>) -> Vec<Page> {
    raw_pages
        .into_iter()
        .enumerate()
        .filter_map(|(i, raw)| {
            let text = normalize_whitespace(&raw);
            (!text.is_empty()).then_some(Page {
                number: i + 1,
                text,
            })
        })
        .collect()
}

/// Collapse newlines and runs of whitespace into single spaces.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! PDF text extraction for title detection.
//!
//! Walks the first pages of a document with `lopdf` and produces the
//! [`RawPage`] span contract consumed by `pdftitle_core`.

use std::path::Path;

use pdftitle_core::RawPage;
use thiserror::Error;

use parser::backend::{LopdfBackend, PageBox, PdfBackend};

pub mod parser;
pub mod text;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Extract raw spans from PDF bytes. Only the first `max_pages` pages are
/// walked when a limit is given.
pub fn extract_pages(bytes: &[u8], max_pages: Option<usize>) -> Result<Vec<RawPage>, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    extract_with(&backend, max_pages)
}

/// Read a PDF file and extract its raw spans.
pub fn extract_file(path: &Path, max_pages: Option<usize>) -> Result<Vec<RawPage>, PdfError> {
    let backend = LopdfBackend::load_file(path)?;
    log::debug!("{}: {} pages", path.display(), backend.page_count());
    extract_with(&backend, max_pages)
}

/// Extract raw spans through any [`PdfBackend`].
pub fn extract_with(
    backend: &dyn PdfBackend,
    max_pages: Option<usize>,
) -> Result<Vec<RawPage>, PdfError> {
    let page_map = backend.pages();
    let limit = max_pages.unwrap_or(page_map.len());
    let mut pages = Vec::with_capacity(limit.min(page_map.len()));

    for (&number, &page_id) in page_map.iter().take(limit) {
        let page_box = backend.page_box(page_id).unwrap_or_else(|e| {
            log::warn!("page {number}: {e}, assuming US Letter");
            PageBox::LETTER
        });
        let runs = parser::spans::extract_page_runs(backend, page_id)?;
        let page = parser::spans::to_raw_page(number as usize, page_box, runs);
        log::debug!(
            "page {number}: {} spans on {}x{} pt",
            page.spans.len(),
            page.width,
            page.height
        );
        pages.push(page);
    }

    Ok(pages)
}

/// Number of pages in a PDF without extracting any text.
pub fn page_count(bytes: &[u8]) -> Result<usize, PdfError> {
    Ok(LopdfBackend::load_bytes(bytes)?.page_count())
}

//! End-to-end analysis of one document's spans.

use serde::Serialize;

use crate::config::ExtractionConfig;
use crate::element::{normalize_pages, Page};
use crate::outline::{build_outline, OutputRecord};
use crate::rank::{select_title, TitleSelection};
use crate::span::RawPage;

/// Everything produced for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentAnalysis {
    pub pages: Vec<Page>,
    pub selection: TitleSelection,
    pub record: OutputRecord,
}

impl DocumentAnalysis {
    pub fn element_count(&self) -> usize {
        self.pages.iter().map(|p| p.elements.len()).sum()
    }
}

/// Normalize, score, rank, and build the output record.
pub fn analyze(raw_pages: Vec<RawPage>, config: &ExtractionConfig) -> DocumentAnalysis {
    let pages = normalize_pages(&raw_pages, config);
    let selection = select_title(&pages);

    let outline = if config.build_outline {
        build_outline(&pages, &selection)
    } else {
        Vec::new()
    };
    let record = OutputRecord::new(selection.title.clone(), outline).into_valid_or_fallback();

    DocumentAnalysis {
        pages,
        selection,
        record,
    }
}

//! Output record, schema validation, and the heuristic heading outline.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::Page;
use crate::rank::{ScoredCandidate, TitleSelection, FALLBACK_TITLE};
use crate::score::score;

// ---------------------------------------------------------------------------
// Output record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    /// Level for the 0-based rank of a heading size, largest first.
    pub fn from_rank(rank: usize) -> Option<Self> {
        match rank {
            0 => Some(HeadingLevel::H1),
            1 => Some(HeadingLevel::H2),
            2 => Some(HeadingLevel::H3),
            _ => None,
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadingLevel::H1 => write!(f, "H1"),
            HeadingLevel::H2 => write!(f, "H2"),
            HeadingLevel::H3 => write!(f, "H3"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub level: HeadingLevel,
    pub text: String,
    /// 1-based page number.
    pub page: u32,
}

/// The JSON artifact written for every input document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub title: String,
    pub outline: Vec<OutlineEntry>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Malformed record: {0}")]
    Malformed(String),
    #[error("Outline entry {index} has page {page}, pages start at 1")]
    InvalidPage { index: usize, page: u32 },
    #[error("Outline entry {index} has empty text")]
    EmptyEntry { index: usize },
}

impl OutputRecord {
    pub fn new(title: impl Into<String>, outline: Vec<OutlineEntry>) -> Self {
        Self {
            title: title.into(),
            outline,
        }
    }

    /// `{"title": "Untitled Document", "outline": []}`
    pub fn fallback() -> Self {
        Self::new(FALLBACK_TITLE, Vec::new())
    }

    pub fn is_fallback(&self) -> bool {
        self == &Self::fallback()
    }

    /// Check the constraints serde cannot express.
    pub fn validate(&self) -> Result<(), RecordError> {
        for (index, entry) in self.outline.iter().enumerate() {
            if entry.page < 1 {
                return Err(RecordError::InvalidPage {
                    index,
                    page: entry.page,
                });
            }
            if entry.text.trim().is_empty() {
                return Err(RecordError::EmptyEntry { index });
            }
        }
        Ok(())
    }

    /// Parse and validate a record from JSON.
    pub fn parse(json: &str) -> Result<Self, RecordError> {
        let record: OutputRecord =
            serde_json::from_str(json).map_err(|e| RecordError::Malformed(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Parse a record, substituting the fallback on any schema violation.
    pub fn parse_or_fallback(json: &str) -> Self {
        Self::parse(json).unwrap_or_else(|_| Self::fallback())
    }

    /// The record itself when valid, the fallback otherwise.
    pub fn into_valid_or_fallback(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(_) => Self::fallback(),
        }
    }
}

// ---------------------------------------------------------------------------
// Font statistics
// ---------------------------------------------------------------------------

/// Quantisation bucket width for font sizes (points).
const FONT_SIZE_BUCKET: f64 = 0.5;

/// Headings must exceed the body size by this much.
const HEADING_SIZE_MARGIN: f64 = 1.5;

/// Longer lines are never headings.
const MAX_HEADING_CHARS: usize = 200;

/// Fallback body size when a document has no text.
const DEFAULT_BODY_SIZE: f64 = 12.0;

/// Aggregate font-size statistics computed across the retained elements.
#[derive(Debug, Clone, PartialEq)]
pub struct FontStatistics {
    /// The font size bucket holding the most characters.
    pub body_size: f64,
    /// Sizes strictly above this value are considered headings.
    pub heading_threshold: f64,
}

fn bucket(size: f64) -> f64 {
    (size / FONT_SIZE_BUCKET).round() * FONT_SIZE_BUCKET
}

fn bucket_key(size: f64) -> i64 {
    (bucket(size) * 100.0).round() as i64
}

/// Character-weighted font statistics over every element of every page.
pub fn build_font_statistics(pages: &[Page]) -> FontStatistics {
    let mut histogram: HashMap<i64, usize> = HashMap::new();

    for element in pages.iter().flat_map(|p| p.elements.iter()) {
        if element.font_size <= 0.0 {
            continue;
        }
        *histogram.entry(bucket_key(element.font_size)).or_insert(0) += element.len();
    }

    // Ties go to the smaller size so the result does not depend on map order.
    let body_size = histogram
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(key, _)| key as f64 / 100.0)
        .unwrap_or(DEFAULT_BODY_SIZE);

    FontStatistics {
        body_size,
        heading_threshold: body_size + HEADING_SIZE_MARGIN,
    }
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// Build the heading outline from scored pages.
///
/// Headings are positively scored elements larger than the heading threshold,
/// excluding the element chosen as the title. The three largest distinct
/// sizes map to H1..H3; smaller heading sizes are left out.
pub fn build_outline(pages: &[Page], selection: &TitleSelection) -> Vec<OutlineEntry> {
    let threshold = build_font_statistics(pages).heading_threshold;
    let title_at = selection.winner().map(|c: &ScoredCandidate| (c.page, c.index));

    let headings: Vec<(usize, &str, f64)> = pages
        .iter()
        .flat_map(move |page| {
            page.elements
                .iter()
                .enumerate()
                .filter(move |(index, element)| {
                    title_at != Some((page.number(), *index))
                        && element.font_size > threshold
                        && element.len() <= MAX_HEADING_CHARS
                        && score(element, page.index) > 0
                })
                .map(move |(_, element)| {
                    (page.number(), element.text.as_str(), element.font_size)
                })
        })
        .collect();

    let mut sizes: Vec<i64> = headings.iter().map(|(_, _, size)| bucket_key(*size)).collect();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    sizes.dedup();

    headings
        .into_iter()
        .filter_map(|(page, text, size)| {
            let rank = sizes.iter().position(|&s| s == bucket_key(size))?;
            Some(OutlineEntry {
                level: HeadingLevel::from_rank(rank)?,
                text: text.to_string(),
                page: page as u32,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::TextElement;
    use crate::rank::select_title;

    fn element(text: &str, font_size: f64, y: f64) -> TextElement {
        TextElement {
            text: text.to_string(),
            font_size,
            x_position: 0.1,
            y_position: y,
            width: 0.3,
            page_width: 612.0,
            page_height: 792.0,
            is_bold: false,
            is_italic: false,
        }
    }

    fn body(n: usize, y: f64) -> TextElement {
        element(
            &format!("Body text line number {n} with enough words to dominate"),
            10.0,
            y,
        )
    }

    // -- record ----------------------------------------------------------

    #[test]
    fn test_fallback_record_json() {
        let json = serde_json::to_value(OutputRecord::fallback()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "title": "Untitled Document", "outline": [] })
        );
    }

    #[test]
    fn test_heading_level_serializes_as_string() {
        let entry = OutlineEntry {
            level: HeadingLevel::H2,
            text: "Background".to_string(),
            page: 3,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "level": "H2", "text": "Background", "page": 3 })
        );
    }

    #[test]
    fn test_parse_valid_record() {
        let record = OutputRecord::parse(
            r#"{"title": "Report", "outline": [{"level": "H1", "text": "Intro", "page": 1}]}"#,
        )
        .unwrap();
        assert_eq!(record.title, "Report");
        assert_eq!(record.outline[0].level, HeadingLevel::H1);
    }

    #[test]
    fn test_parse_rejects_unknown_level() {
        let err = OutputRecord::parse(
            r#"{"title": "Report", "outline": [{"level": "H4", "text": "Intro", "page": 1}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::Malformed(_)));
    }

    #[test]
    fn test_parse_rejects_page_zero() {
        let err = OutputRecord::parse(
            r#"{"title": "Report", "outline": [{"level": "H1", "text": "Intro", "page": 0}]}"#,
        )
        .unwrap_err();
        assert_eq!(err, RecordError::InvalidPage { index: 0, page: 0 });
    }

    #[test]
    fn test_parse_rejects_negative_page_and_missing_fields() {
        assert!(OutputRecord::parse(
            r#"{"title": "R", "outline": [{"level": "H1", "text": "I", "page": -2}]}"#
        )
        .is_err());
        assert!(OutputRecord::parse(r#"{"outline": []}"#).is_err());
        assert!(OutputRecord::parse("not json at all").is_err());
    }

    #[test]
    fn test_parse_or_fallback() {
        let record = OutputRecord::parse_or_fallback(r#"{"title": 42, "outline": []}"#);
        assert!(record.is_fallback());

        let record = OutputRecord::parse_or_fallback(r#"{"title": "Kept", "outline": []}"#);
        assert_eq!(record.title, "Kept");
    }

    #[test]
    fn test_into_valid_or_fallback() {
        let bad = OutputRecord::new(
            "Report",
            vec![OutlineEntry {
                level: HeadingLevel::H1,
                text: "   ".to_string(),
                page: 1,
            }],
        );
        assert!(bad.into_valid_or_fallback().is_fallback());

        let good = OutputRecord::new("Report", Vec::new());
        assert_eq!(good.clone().into_valid_or_fallback(), good);
    }

    // -- font statistics -------------------------------------------------

    #[test]
    fn test_font_statistics_body_size() {
        let pages = vec![Page {
            index: 0,
            elements: vec![
                element(&"a".repeat(500), 12.0, 0.5),
                element(&"b".repeat(50), 18.0, 0.5),
                element(&"c".repeat(10), 24.0, 0.5),
            ],
        }];
        let stats = build_font_statistics(&pages);
        assert!((stats.body_size - 12.0).abs() < FONT_SIZE_BUCKET);
        assert!((stats.heading_threshold - 13.5).abs() < FONT_SIZE_BUCKET);
    }

    #[test]
    fn test_font_statistics_empty_input() {
        let stats = build_font_statistics(&[]);
        assert!((stats.body_size - DEFAULT_BODY_SIZE).abs() < 0.01);
    }

    #[test]
    fn test_font_statistics_ignores_zero_size() {
        let pages = vec![Page {
            index: 0,
            elements: vec![element("visible", 11.0, 0.5), element(&"x".repeat(90), 0.0, 0.5)],
        }];
        let stats = build_font_statistics(&pages);
        assert!((stats.body_size - 11.0).abs() < 0.01);
    }

    // -- outline ---------------------------------------------------------

    #[test]
    fn test_outline_levels_by_size_rank() {
        let pages = vec![
            Page {
                index: 0,
                elements: vec![
                    element("Annual Report 2024", 28.0, 0.9),
                    element("Introduction", 20.0, 0.7),
                    body(1, 0.6),
                    element("Scope of the work", 16.0, 0.5),
                    body(2, 0.4),
                ],
            },
            Page {
                index: 1,
                elements: vec![
                    element("Methods and data", 20.0, 0.85),
                    element("Sampling approach", 16.0, 0.6),
                    element("Field notes", 14.0, 0.5),
                    body(3, 0.4),
                    body(4, 0.3),
                ],
            },
        ];
        let selection = select_title(&pages);
        assert_eq!(selection.title, "Annual Report 2024");

        let outline = build_outline(&pages, &selection);
        let summary: Vec<_> = outline
            .iter()
            .map(|e| (e.level, e.text.as_str(), e.page))
            .collect();
        assert_eq!(
            summary,
            vec![
                (HeadingLevel::H1, "Introduction", 1),
                (HeadingLevel::H2, "Scope of the work", 1),
                (HeadingLevel::H1, "Methods and data", 2),
                (HeadingLevel::H2, "Sampling approach", 2),
                (HeadingLevel::H3, "Field notes", 2),
            ]
        );
    }

    #[test]
    fn test_outline_ignores_sizes_below_third_rank() {
        let pages = vec![Page {
            index: 0,
            elements: vec![
                element("Document Title Here", 30.0, 0.9),
                element("Level one heading", 24.0, 0.6),
                element("Level two heading", 20.0, 0.5),
                element("Level three heading", 16.0, 0.4),
                element("Level four heading", 14.0, 0.3),
                body(1, 0.5),
                body(2, 0.4),
                body(3, 0.3),
            ],
        }];
        let selection = select_title(&pages);
        let outline = build_outline(&pages, &selection);
        let texts: Vec<_> = outline.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Level one heading", "Level two heading", "Level three heading"]
        );
    }

    #[test]
    fn test_outline_empty_without_large_text() {
        let pages = vec![Page {
            index: 0,
            elements: vec![body(1, 0.6), body(2, 0.5)],
        }];
        let selection = select_title(&pages);
        assert!(build_outline(&pages, &selection).is_empty());
    }

    #[test]
    fn test_outline_is_valid_record() {
        let pages = vec![Page {
            index: 0,
            elements: vec![
                element("Document Title Here", 30.0, 0.9),
                element("Level one heading", 24.0, 0.6),
                body(1, 0.5),
            ],
        }];
        let selection = select_title(&pages);
        let record = OutputRecord::new(selection.title.clone(), build_outline(&pages, &selection));
        assert!(record.validate().is_ok());
        assert!(record.outline.iter().all(|e| e.page >= 1));
    }
}

//! Span Normalizer.
//!
//! Converts [`RawPage`]s into [`Page`]s of [`TextElement`]s with page-relative
//! coordinates. Vertical positions are flipped so that `1.0` is the top of the
//! page and `0.0` the bottom.

use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::score::{is_header_footer_band, is_page_number};
use crate::span::{RawPage, RawSpan};

/// One glyph run with normalized geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    /// Non-empty, trimmed.
    pub text: String,
    pub font_size: f64,
    pub x_position: f64,
    /// `1.0` is the top of the page.
    pub y_position: f64,
    pub width: f64,
    pub page_width: f64,
    pub page_height: f64,
    pub is_bold: bool,
    pub is_italic: bool,
}

impl TextElement {
    /// Character count of the text.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// The elements of one page in extraction order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    /// 0-based page index within the document.
    pub index: usize,
    pub elements: Vec<TextElement>,
}

impl Page {
    /// 1-based page number, as reported in output records.
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

/// Normalize a single span against its page dimensions.
///
/// Returns `None` for spans whose trimmed text is empty, whose font size is
/// not a finite number, or when the page has no usable area.
pub fn normalize_span(span: &RawSpan, page_width: f64, page_height: f64) -> Option<TextElement> {
    let text = span.text.trim();
    if text.is_empty() {
        return None;
    }
    if !(page_width > 0.0 && page_height > 0.0) || !span.font_size.is_finite() {
        return None;
    }

    Some(TextElement {
        text: text.to_string(),
        font_size: span.font_size,
        x_position: span.bbox.left / page_width,
        y_position: 1.0 - span.bbox.top / page_height,
        width: span.bbox.width() / page_width,
        page_width,
        page_height,
        is_bold: span.is_bold(),
        is_italic: span.is_italic(),
    })
}

/// Normalize one page. With `early_filter`, header/footer band and
/// page-number spans are dropped here instead of being penalized later.
pub fn normalize_page(raw: &RawPage, index: usize, early_filter: bool) -> Page {
    let elements = raw
        .spans
        .iter()
        .filter_map(|span| normalize_span(span, raw.width, raw.height))
        .filter(|element| {
            !early_filter
                || !(is_page_number(&element.text) || is_header_footer_band(element.y_position))
        })
        .collect();

    Page { index, elements }
}

/// Normalize a document, honoring the configured page limit.
pub fn normalize_pages(raw_pages: &[RawPage], config: &ExtractionConfig) -> Vec<Page> {
    let limit = config.page_limit.unwrap_or(usize::MAX);

    raw_pages
        .iter()
        .take(limit)
        .enumerate()
        .map(|(index, raw)| normalize_page(raw, index, config.early_filter))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Variant;
    use crate::span::{font_flags, BBox};

    const LETTER_W: f64 = 612.0;
    const LETTER_H: f64 = 792.0;

    fn raw_span(text: &str, left: f64, top: f64, right: f64, flags: u32) -> RawSpan {
        RawSpan {
            text: text.to_string(),
            font_size: 12.0,
            flags,
            bbox: BBox::new(left, top, right, top + 12.0),
        }
    }

    fn raw_page(number: usize, spans: Vec<RawSpan>) -> RawPage {
        RawPage {
            number,
            width: LETTER_W,
            height: LETTER_H,
            spans,
        }
    }

    #[test]
    fn test_y_flip_top_of_page() {
        let span = raw_span("Top", 0.0, 0.0, 10.0, 0);
        let element = normalize_span(&span, LETTER_W, LETTER_H).unwrap();
        assert_eq!(element.y_position, 1.0);
    }

    #[test]
    fn test_y_flip_bottom_of_page() {
        let span = raw_span("Bottom", 0.0, LETTER_H, 10.0, 0);
        let element = normalize_span(&span, LETTER_W, LETTER_H).unwrap();
        assert_eq!(element.y_position, 0.0);
    }

    #[test]
    fn test_y_flip_is_one_minus_top_over_height() {
        let span = raw_span("Middle", 0.0, 198.0, 10.0, 0);
        let element = normalize_span(&span, LETTER_W, LETTER_H).unwrap();
        assert!((element.y_position - (1.0 - 198.0 / LETTER_H)).abs() < 1e-12);
        assert!((element.y_position - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_horizontal_normalization() {
        let span = raw_span("Wide", 153.0, 100.0, 459.0, 0);
        let element = normalize_span(&span, LETTER_W, LETTER_H).unwrap();
        assert!((element.x_position - 0.25).abs() < 1e-12);
        assert!((element.width - 0.5).abs() < 1e-12);
        assert_eq!(element.page_width, LETTER_W);
        assert_eq!(element.page_height, LETTER_H);
    }

    #[test]
    fn test_text_is_trimmed() {
        let span = raw_span("   Annual Report \t", 0.0, 100.0, 10.0, 0);
        let element = normalize_span(&span, LETTER_W, LETTER_H).unwrap();
        assert_eq!(element.text, "Annual Report");
    }

    #[test]
    fn test_whitespace_only_span_is_dropped() {
        let span = raw_span(" \t\n ", 0.0, 100.0, 10.0, 0);
        assert!(normalize_span(&span, LETTER_W, LETTER_H).is_none());
    }

    #[test]
    fn test_degenerate_page_is_dropped() {
        let span = raw_span("Text", 0.0, 100.0, 10.0, 0);
        assert!(normalize_span(&span, 0.0, LETTER_H).is_none());
        assert!(normalize_span(&span, LETTER_W, 0.0).is_none());
    }

    #[test]
    fn test_non_finite_font_size_is_dropped() {
        let mut span = raw_span("Text", 0.0, 100.0, 10.0, 0);
        span.font_size = f64::NAN;
        assert!(normalize_span(&span, LETTER_W, LETTER_H).is_none());
    }

    #[test]
    fn test_flags_decode() {
        let bold = normalize_span(
            &raw_span("Bold", 0.0, 100.0, 10.0, font_flags::BOLD),
            LETTER_W,
            LETTER_H,
        )
        .unwrap();
        assert!(bold.is_bold);
        assert!(!bold.is_italic);

        let italic = normalize_span(
            &raw_span("Italic", 0.0, 100.0, 10.0, font_flags::ITALIC | font_flags::SERIFED),
            LETTER_W,
            LETTER_H,
        )
        .unwrap();
        assert!(italic.is_italic);
        assert!(!italic.is_bold);
    }

    #[test]
    fn test_reading_order_preserved() {
        let page = raw_page(
            1,
            vec![
                raw_span("Third on page", 0.0, 600.0, 10.0, 0),
                raw_span("First on page", 0.0, 100.0, 10.0, 0),
                raw_span("   ", 0.0, 200.0, 10.0, 0),
                raw_span("Second on page", 0.0, 300.0, 10.0, 0),
            ],
        );
        let normalized = normalize_page(&page, 0, false);
        let texts: Vec<_> = normalized.elements.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Third on page", "First on page", "Second on page"]);
    }

    #[test]
    fn test_baseline_keeps_headers_and_page_numbers() {
        let page = raw_page(
            1,
            vec![
                raw_span("Running header text", 0.0, 10.0, 10.0, 0),
                raw_span("12", 0.0, 500.0, 10.0, 0),
                raw_span("Body paragraph", 0.0, 400.0, 10.0, 0),
            ],
        );
        let normalized = normalize_page(&page, 0, false);
        assert_eq!(normalized.elements.len(), 3);
    }

    #[test]
    fn test_early_filter_drops_band_and_page_numbers() {
        let page = raw_page(
            1,
            vec![
                // y = 1 - 10/792 > 0.95
                raw_span("Running header text", 0.0, 10.0, 10.0, 0),
                // y = 1 - 780/792 < 0.05
                raw_span("Confidential footer", 0.0, 780.0, 10.0, 0),
                raw_span("Page 4 of 9", 0.0, 500.0, 10.0, 0),
                raw_span("ii", 0.0, 500.0, 10.0, 0),
                raw_span("Body paragraph", 0.0, 400.0, 10.0, 0),
            ],
        );
        let normalized = normalize_page(&page, 0, true);
        let texts: Vec<_> = normalized.elements.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Body paragraph"]);
    }

    #[test]
    fn test_baseline_page_limit() {
        let pages: Vec<RawPage> = (1..=5)
            .map(|n| raw_page(n, vec![raw_span("Some content", 0.0, 300.0, 10.0, 0)]))
            .collect();

        let normalized = normalize_pages(&pages, &ExtractionConfig::for_variant(Variant::Baseline));
        assert_eq!(normalized.len(), 3);
        assert_eq!(
            normalized.iter().map(|p| p.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(normalized[2].number(), 3);
    }

    #[test]
    fn test_extended_processes_all_pages() {
        let pages: Vec<RawPage> = (1..=5)
            .map(|n| raw_page(n, vec![raw_span("Some content", 0.0, 300.0, 10.0, 0)]))
            .collect();

        let normalized = normalize_pages(&pages, &ExtractionConfig::for_variant(Variant::Extended));
        assert_eq!(normalized.len(), 5);
    }

    #[test]
    fn test_page_limit_larger_than_document() {
        let pages = vec![raw_page(1, vec![raw_span("Only page", 0.0, 300.0, 10.0, 0)])];
        let normalized = normalize_pages(&pages, &ExtractionConfig::default());
        assert_eq!(normalized.len(), 1);
    }

    #[test]
    fn test_element_len_counts_chars() {
        let span = raw_span("Résumé", 0.0, 100.0, 10.0, 0);
        let element = normalize_span(&span, LETTER_W, LETTER_H).unwrap();
        assert_eq!(element.len(), 6);
    }
}

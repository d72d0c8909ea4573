//! Title/Heading Scorer.
//!
//! The score of a [`TextElement`] is the sum of independent, named signal
//! contributions. Each signal is a pure function of the element and its
//! 0-based page index, so every rule can be tested in isolation.
//!
//! | Signal                 | Condition                         | Points |
//! |------------------------|-----------------------------------|--------|
//! | `FontSize`             | >= 18pt / >= 14pt                 | +40 / +20 |
//! | `PagePosition`         | first / second page               | +25 / +10 |
//! | `VerticalPosition`     | y > 0.7                           | +15 |
//! | `Alignment`            | centered / left-aligned           | +15 / +5 |
//! | `Bold`                 | bold                              | +10 |
//! | `Italic`               | italic                            | +5 |
//! | `TextLength`           | 10..=100 chars / > 200 chars      | +10 / -20 |
//! | `AllCaps`              | upper case and > 5 chars          | +8 |
//! | `WhitespaceIsolation`  | y > 0.8 or y < 0.2                | +10 |
//! | `HeaderFooter`         | y > 0.95 or y < 0.05              | -50 |
//! | `PageNumber`           | digits, "page..." or <= 3 chars   | -50 |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::TextElement;

/// Lowest score any element can receive.
pub const MIN_SCORE: i32 = -110;
/// Highest score any element can receive.
pub const MAX_SCORE: i32 = 138;

const LARGE_FONT: f64 = 18.0;
const MEDIUM_FONT: f64 = 14.0;
const TOP_REGION: f64 = 0.7;
const CENTER_TOLERANCE: f64 = 0.1;
const LEFT_MARGIN: f64 = 0.2;
const ISOLATION_TOP: f64 = 0.8;
const ISOLATION_BOTTOM: f64 = 0.2;
const BAND_TOP: f64 = 0.95;
const BAND_BOTTOM: f64 = 0.05;
const MIN_TITLE_LEN: usize = 10;
const MAX_TITLE_LEN: usize = 100;
const LONG_TEXT_LEN: usize = 200;
const MIN_ALL_CAPS_LEN: usize = 5;
const MAX_PAGE_NUMBER_LEN: usize = 3;

/// One row of the scoring table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    FontSize,
    PagePosition,
    VerticalPosition,
    Alignment,
    Bold,
    Italic,
    TextLength,
    AllCaps,
    WhitespaceIsolation,
    HeaderFooter,
    PageNumber,
}

impl Signal {
    /// Every signal, in evaluation order.
    pub const ALL: [Signal; 11] = [
        Signal::FontSize,
        Signal::PagePosition,
        Signal::VerticalPosition,
        Signal::Alignment,
        Signal::Bold,
        Signal::Italic,
        Signal::TextLength,
        Signal::AllCaps,
        Signal::WhitespaceIsolation,
        Signal::HeaderFooter,
        Signal::PageNumber,
    ];

    /// Points this signal contributes for `element` on page `page_index`.
    pub fn points(self, element: &TextElement, page_index: usize) -> i32 {
        match self {
            Signal::FontSize => font_size_points(element.font_size),
            Signal::PagePosition => page_position_points(page_index),
            Signal::VerticalPosition => vertical_position_points(element.y_position),
            Signal::Alignment => alignment_points(element),
            Signal::Bold => bold_points(element.is_bold),
            Signal::Italic => italic_points(element.is_italic),
            Signal::TextLength => text_length_points(element.len()),
            Signal::AllCaps => all_caps_points(&element.text),
            Signal::WhitespaceIsolation => whitespace_isolation_points(element.y_position),
            Signal::HeaderFooter => header_footer_points(element.y_position),
            Signal::PageNumber => page_number_points(&element.text),
        }
    }

    /// Inclusive `(min, max)` contribution of this signal.
    pub fn range(self) -> (i32, i32) {
        match self {
            Signal::FontSize => (0, 40),
            Signal::PagePosition => (0, 25),
            Signal::VerticalPosition => (0, 15),
            Signal::Alignment => (0, 15),
            Signal::Bold => (0, 10),
            Signal::Italic => (0, 5),
            Signal::TextLength => (-20, 10),
            Signal::AllCaps => (0, 8),
            Signal::WhitespaceIsolation => (0, 10),
            Signal::HeaderFooter => (-50, 0),
            Signal::PageNumber => (-50, 0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Signal::FontSize => "font size",
            Signal::PagePosition => "page position",
            Signal::VerticalPosition => "vertical position",
            Signal::Alignment => "alignment",
            Signal::Bold => "bold",
            Signal::Italic => "italic",
            Signal::TextLength => "text length",
            Signal::AllCaps => "all caps",
            Signal::WhitespaceIsolation => "whitespace isolation",
            Signal::HeaderFooter => "header/footer",
            Signal::PageNumber => "page number",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------
// Public API: scoring
// ---------------------------------------------------------------------------

/// Heuristic title score of `element` on the 0-based page `page_index`.
pub fn score(element: &TextElement, page_index: usize) -> i32 {
    Signal::ALL
        .iter()
        .map(|signal| signal.points(element, page_index))
        .sum()
}

/// The non-zero contributions behind [`score`], in evaluation order.
pub fn breakdown(element: &TextElement, page_index: usize) -> Vec<(Signal, i32)> {
    Signal::ALL
        .iter()
        .map(|&signal| (signal, signal.points(element, page_index)))
        .filter(|(_, points)| *points != 0)
        .collect()
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

pub fn font_size_points(font_size: f64) -> i32 {
    if font_size >= LARGE_FONT {
        40
    } else if font_size >= MEDIUM_FONT {
        20
    } else {
        0
    }
}

pub fn page_position_points(page_index: usize) -> i32 {
    match page_index {
        0 => 25,
        1 => 10,
        _ => 0,
    }
}

pub fn vertical_position_points(y_position: f64) -> i32 {
    if y_position > TOP_REGION {
        15
    } else {
        0
    }
}

pub fn alignment_points(element: &TextElement) -> i32 {
    if is_centered(element) {
        15
    } else if is_left_aligned(element) {
        5
    } else {
        0
    }
}

pub fn bold_points(is_bold: bool) -> i32 {
    if is_bold {
        10
    } else {
        0
    }
}

pub fn italic_points(is_italic: bool) -> i32 {
    if is_italic {
        5
    } else {
        0
    }
}

pub fn text_length_points(len: usize) -> i32 {
    if (MIN_TITLE_LEN..=MAX_TITLE_LEN).contains(&len) {
        10
    } else if len > LONG_TEXT_LEN {
        -20
    } else {
        0
    }
}

pub fn all_caps_points(text: &str) -> i32 {
    if is_all_caps(text) && text.chars().count() > MIN_ALL_CAPS_LEN {
        8
    } else {
        0
    }
}

pub fn whitespace_isolation_points(y_position: f64) -> i32 {
    if has_whitespace_isolation(y_position) {
        10
    } else {
        0
    }
}

pub fn header_footer_points(y_position: f64) -> i32 {
    if is_header_footer_band(y_position) {
        -50
    } else {
        0
    }
}

pub fn page_number_points(text: &str) -> i32 {
    if is_page_number(text) {
        -50
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Horizontal midpoint within 0.1 of the page center.
pub fn is_centered(element: &TextElement) -> bool {
    let midpoint = element.x_position + element.width / 2.0;
    (midpoint - 0.5).abs() < CENTER_TOLERANCE
}

pub fn is_left_aligned(element: &TextElement) -> bool {
    element.x_position < LEFT_MARGIN
}

/// Near the top or bottom edge, where titles tend to sit apart from body text.
pub fn has_whitespace_isolation(y_position: f64) -> bool {
    y_position > ISOLATION_TOP || y_position < ISOLATION_BOTTOM
}

/// Top or bottom 5% of the page.
pub fn is_header_footer_band(y_position: f64) -> bool {
    y_position > BAND_TOP || y_position < BAND_BOTTOM
}

/// Looks like a page number: all digits, a "page" prefix, or at most three
/// characters. Short genuine titles ("Go", "Tao") also match.
pub fn is_page_number(text: &str) -> bool {
    let text = text.trim();
    let all_digits = !text.is_empty() && text.chars().all(char::is_numeric);

    all_digits
        || text.to_lowercase().starts_with("page")
        || text.chars().count() <= MAX_PAGE_NUMBER_LEN
}

/// At least one cased character and no lowercase ones.
pub fn is_all_caps(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

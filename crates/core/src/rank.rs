//! Candidate collection, ranking, and title selection.

use serde::{Deserialize, Serialize};

use crate::element::{Page, TextElement};
use crate::score::score;

/// Title used when no element scores above zero.
pub const FALLBACK_TITLE: &str = "Untitled Document";

/// Normalized position of a candidate on its page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Snapshot of an element that scored above zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub text: String,
    pub score: i32,
    /// 1-based page number.
    pub page: usize,
    /// Position of the element within its page.
    pub index: usize,
    pub font_size: f64,
    pub is_bold: bool,
    pub position: Position,
}

impl ScoredCandidate {
    fn from_element(element: &TextElement, score: i32, page: &Page, index: usize) -> Self {
        Self {
            text: element.text.clone(),
            score,
            page: page.number(),
            index,
            font_size: element.font_size,
            is_bold: element.is_bold,
            position: Position {
                x: element.x_position,
                y: element.y_position,
            },
        }
    }
}

/// The chosen title and the ranked candidates behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleSelection {
    pub title: String,
    /// Sorted by descending score; ties keep encounter order.
    pub candidates: Vec<ScoredCandidate>,
}

impl TitleSelection {
    /// The candidate the title was taken from, if any.
    pub fn winner(&self) -> Option<&ScoredCandidate> {
        self.candidates.first()
    }
}

/// Score every element and keep those above zero, in encounter order
/// (page order, then reading order within the page).
pub fn collect_candidates(pages: &[Page]) -> Vec<ScoredCandidate> {
    pages
        .iter()
        .flat_map(|page| {
            page.elements
                .iter()
                .enumerate()
                .filter_map(move |(index, element)| {
                    let points = score(element, page.index);
                    (points > 0)
                        .then(|| ScoredCandidate::from_element(element, points, page, index))
                })
        })
        .collect()
}

/// Stable sort by descending score.
pub fn rank(mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

/// Pick the title from the already-limited set of pages.
pub fn select_title(pages: &[Page]) -> TitleSelection {
    let candidates = rank(collect_candidates(pages));
    let title = candidates
        .first()
        .map(|c| c.text.clone())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string());

    TitleSelection { title, candidates }
}

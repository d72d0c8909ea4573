//! Raw span contract between the extraction layer and the normalizer.
//!
//! Coordinates here are in page points with the origin at the top-left
//! corner of the page and y growing downward.

use serde::{Deserialize, Serialize};

/// Font-descriptor bit flags as reported for each span.
pub mod font_flags {
    pub const SUPERSCRIPT: u32 = 1;
    pub const ITALIC: u32 = 1 << 1;
    pub const SERIFED: u32 = 1 << 2;
    pub const MONOSPACED: u32 = 1 << 3;
    pub const BOLD: u32 = 1 << 4;
}

/// Axis-aligned bounding box in page points (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }
}

/// One glyph run as produced by the extraction layer. `text` is untrimmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    pub text: String,
    pub font_size: f64,
    pub flags: u32,
    pub bbox: BBox,
}

impl RawSpan {
    pub fn is_bold(&self) -> bool {
        self.flags & font_flags::BOLD != 0
    }

    pub fn is_italic(&self) -> bool {
        self.flags & font_flags::ITALIC != 0
    }
}

/// All spans of a single page in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    /// 1-based page number.
    pub number: usize,
    pub width: f64,
    pub height: f64,
    pub spans: Vec<RawSpan>,
}

//! Content-stream walking and glyph-run extraction.
//!
//! Every text-showing operator produces one [`GlyphRun`] positioned in
//! default user space (bottom-left origin, after the current transformation
//! matrix). [`to_raw_page`] then converts the runs into the top-left
//! [`RawSpan`] boxes the scoring core consumes.
//!
//! ```text
//! content ops  ->  GlyphRun[]  ->  RawPage
//!   (per page)     extract         to_raw_page
//! ```

use pdftitle_core::span::{font_flags, BBox, RawPage, RawSpan};

use super::backend::{
    decode_text_simple, get_number_from_value, BackendFontInfo, PageBox, PageId, PdfBackend,
    PdfValue,
};
use crate::text::clean_span_text;
use crate::PdfError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Approximate glyph advance as a fraction of the font size. No glyph
/// metrics are read, so every character is assumed to be half an em wide.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Fraction of the font size above the baseline covered by the box.
const ASCENT_RATIO: f64 = 0.8;

/// Fraction of the font size below the baseline covered by the box.
const DESCENT_RATIO: f64 = 0.2;

/// A kerning gap wider than this fraction of a glyph reads as a word break.
const KERNING_SPACE_RATIO: f32 = 0.3;

/// Baselines closer than this (points) belong to the same line.
const BASELINE_TOLERANCE: f32 = 1.0;

/// Minimum gap (points) between adjacent runs before a space is inserted.
const MIN_WORD_GAP: f32 = 1.5;

/// Runs whose rendered sizes differ by less than this share a font size.
const FONT_SIZE_TOLERANCE: f32 = 0.5;

/// The identity matrix: [a, b, c, d, e, f].
const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

// FontDescriptor /Flags bits.
const DESCRIPTOR_FIXED_PITCH: i64 = 1;
const DESCRIPTOR_SERIF: i64 = 1 << 1;
const DESCRIPTOR_ITALIC: i64 = 1 << 6;
const DESCRIPTOR_FORCE_BOLD: i64 = 1 << 18;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Text shown by a single operator, positioned in default user space.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    pub text: String,
    /// Baseline origin of the first glyph.
    pub x: f32,
    pub y: f32,
    /// Estimated advance of the whole run.
    pub width: f32,
    /// Rendered font size after the text and transformation matrices.
    pub font_size: f32,
    /// Flags in the [`font_flags`] convention.
    pub flags: u32,
    /// Font resource name the run was shown with.
    pub font_key: Vec<u8>,
}

impl GlyphRun {
    /// Same font, size, and style on the same baseline.
    fn continues(&self, other: &GlyphRun) -> bool {
        self.font_key == other.font_key
            && self.flags == other.flags
            && (self.font_size - other.font_size).abs() < FONT_SIZE_TOLERANCE
            && (self.y - other.y).abs() <= BASELINE_TOLERANCE
    }
}

// ---------------------------------------------------------------------------
// Matrix helpers
// ---------------------------------------------------------------------------

/// Concatenate two matrices (`m` applied first, then `n`).
fn multiply(m: &[f32; 6], n: &[f32; 6]) -> [f32; 6] {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

/// Read six numeric operands as a matrix.
fn matrix_operand(operands: &[PdfValue]) -> Option<[f32; 6]> {
    let vals: Vec<f32> = operands
        .iter()
        .take(6)
        .filter_map(get_number_from_value)
        .collect();
    match vals.as_slice() {
        &[a, b, c, d, e, f] => Some([a, b, c, d, e, f]),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Font flags
// ---------------------------------------------------------------------------

/// Synthesize span flags from the font descriptor and the base-font name.
pub fn synthesize_flags(base_font: &str, descriptor_flags: Option<i64>) -> u32 {
    let mut flags = 0;

    if let Some(bits) = descriptor_flags {
        if bits & DESCRIPTOR_FIXED_PITCH != 0 {
            flags |= font_flags::MONOSPACED;
        }
        if bits & DESCRIPTOR_SERIF != 0 {
            flags |= font_flags::SERIFED;
        }
        if bits & DESCRIPTOR_ITALIC != 0 {
            flags |= font_flags::ITALIC;
        }
        if bits & DESCRIPTOR_FORCE_BOLD != 0 {
            flags |= font_flags::BOLD;
        }
    }

    // Semibold and Demibold match on BOLD.
    let upper = base_font.to_uppercase();
    if ["BOLD", "BLACK", "HEAVY"].iter().any(|w| upper.contains(w)) {
        flags |= font_flags::BOLD;
    }
    if upper.contains("ITALIC") || upper.contains("OBLIQUE") {
        flags |= font_flags::ITALIC;
    }

    flags
}

// ---------------------------------------------------------------------------
// Internal: text and graphics state
// ---------------------------------------------------------------------------

/// Text parameters tracked while walking a content stream.
#[derive(Debug, Clone)]
struct TextState {
    /// Current font resource name (the `/F1`-style key).
    font_key: Vec<u8>,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    /// Horizontal scaling (Tz / 100).
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
    /// Flags of the current font, without the superscript bit.
    font_flags: u32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
            font_flags: 0,
        }
    }
}

impl TextState {
    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Multiply the line matrix by a translation (Td, TD, T*).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    fn set_font(&mut self, key: Vec<u8>, size: f32, flags: u32) {
        self.font_key = key;
        self.font_size = size;
        self.font_flags = flags;
    }

    fn run_flags(&self) -> u32 {
        if self.text_rise > 0.0 {
            self.font_flags | font_flags::SUPERSCRIPT
        } else {
            self.font_flags
        }
    }

    /// Unscaled advance of `text` in text space.
    fn text_advance(&self, text: &str) -> f32 {
        let glyph = self.font_size * APPROX_CHAR_WIDTH_RATIO;
        let total: f32 = text
            .chars()
            .map(|ch| {
                let word = if ch == ' ' { self.word_spacing } else { 0.0 };
                glyph + self.char_spacing + word
            })
            .sum();
        total * self.horiz_scale
    }

    fn estimate_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }
}

/// Graphics state saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: [f32; 6],
    text: TextState,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY_MATRIX,
            text: TextState::default(),
        }
    }
}

impl GraphicsState {
    /// Text rendering matrix without the font-size scaling.
    fn rendering_matrix(&self) -> [f32; 6] {
        multiply(&self.text.text_matrix, &self.ctm)
    }

    /// Device position of the current glyph origin, including text rise.
    fn origin(&self) -> (f32, f32) {
        let m = self.rendering_matrix();
        let rise = self.text.text_rise;
        (rise * m[2] + m[4], rise * m[3] + m[5])
    }

    fn effective_font_size(&self) -> f32 {
        let m = self.rendering_matrix();
        (self.text.font_size * (m[2].powi(2) + m[3].powi(2)).sqrt()).abs()
    }

    fn horizontal_scale(&self) -> f32 {
        let m = self.rendering_matrix();
        (m[0].powi(2) + m[1].powi(2)).sqrt()
    }

    fn glyph_run(&self, text: String, origin: (f32, f32)) -> GlyphRun {
        let width = self.text.estimate_width(&text) * self.horizontal_scale();
        GlyphRun {
            text,
            x: origin.0,
            y: origin.1,
            width,
            font_size: self.effective_font_size(),
            flags: self.text.run_flags(),
            font_key: self.text.font_key.clone(),
        }
    }
}

fn resolve_font<'a>(key: &[u8], fonts: &'a [BackendFontInfo]) -> Option<&'a BackendFontInfo> {
    fonts.iter().find(|info| info.name == key)
}

fn decode_string(
    val: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    font_key: &[u8],
) -> String {
    match val {
        PdfValue::Str(bytes) => {
            let decoded = backend.decode_text(page_id, font_key, bytes);
            if decoded.is_empty() {
                decode_text_simple(bytes)
            } else {
                decoded
            }
        }
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Public API: run extraction
// ---------------------------------------------------------------------------

/// Walk a page's content stream and collect its glyph runs in stream order.
///
/// | Operator | Action |
/// |----------|--------|
/// | `q` / `Q` | Save / restore graphics state |
/// | `cm`     | Concatenate to the transformation matrix |
/// | `BT`     | Begin text object, reset matrices |
/// | `Tf`     | Set font and size |
/// | `Tm`     | Set text matrix |
/// | `Td` / `TD` / `T*` | Move to a new line |
/// | `TL` `Tc` `Tw` `Tz` `Ts` | Text parameters |
/// | `Tj` / `TJ` / `'` / `"` | Show text |
pub fn extract_page_runs(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<GlyphRun>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_default();

    let mut gs = GraphicsState::default();
    let mut saved: Vec<GraphicsState> = Vec::new();
    let mut runs: Vec<GlyphRun> = Vec::new();

    for op in &ops {
        let operands = op.operands.as_slice();
        let number = |i: usize| operands.get(i).and_then(get_number_from_value);

        match op.operator.as_str() {
            "q" => saved.push(gs.clone()),
            "Q" => {
                // Unbalanced Q is ignored.
                if let Some(prev) = saved.pop() {
                    gs = prev;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operand(operands) {
                    gs.ctm = multiply(&m, &gs.ctm);
                }
            }

            "BT" => {
                gs.text.text_matrix = IDENTITY_MATRIX;
                gs.text.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => {}

            "Tf" => handle_tf(operands, &fonts, &mut gs.text),
            "Tm" => {
                if let Some(m) = matrix_operand(operands) {
                    gs.text.text_matrix = m;
                    gs.text.line_matrix = m;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (number(0), number(1)) {
                    gs.text.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (number(0), number(1)) {
                    gs.text.leading = -ty;
                    gs.text.translate_line(tx, ty);
                }
            }
            "T*" => gs.text.next_line(),
            "TL" => {
                if let Some(v) = number(0) {
                    gs.text.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = number(0) {
                    gs.text.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = number(0) {
                    gs.text.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = number(0) {
                    gs.text.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = number(0) {
                    gs.text.text_rise = v;
                }
            }

            "Tj" => {
                if let Some(first) = operands.first() {
                    show_string(first, backend, page_id, &mut gs, &mut runs);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = operands.first() {
                    show_array(arr, backend, page_id, &mut gs, &mut runs);
                }
            }
            "'" => {
                gs.text.next_line();
                if let Some(first) = operands.first() {
                    show_string(first, backend, page_id, &mut gs, &mut runs);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac), Some(string)) = (number(0), number(1), operands.get(2))
                {
                    gs.text.word_spacing = aw;
                    gs.text.char_spacing = ac;
                    gs.text.next_line();
                    show_string(string, backend, page_id, &mut gs, &mut runs);
                }
            }

            _ => {}
        }
    }

    Ok(runs)
}

fn handle_tf(operands: &[PdfValue], fonts: &[BackendFontInfo], state: &mut TextState) {
    let key = match operands.first() {
        Some(PdfValue::Name(n)) => n.clone(),
        Some(PdfValue::Str(s)) => s.clone(),
        _ => return,
    };
    let size = operands
        .get(1)
        .and_then(get_number_from_value)
        .unwrap_or(0.0);

    let flags = match resolve_font(&key, fonts) {
        Some(info) => synthesize_flags(
            info.base_font.as_deref().unwrap_or(""),
            info.descriptor_flags,
        ),
        // Font missing from the resources; the key is all we have.
        None => synthesize_flags(&String::from_utf8_lossy(&key), None),
    };
    state.set_font(key, size, flags);
}

/// Show one string operand (`Tj`, `'`, `"`).
fn show_string(
    operand: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    gs: &mut GraphicsState,
    runs: &mut Vec<GlyphRun>,
) {
    let text = decode_string(operand, backend, page_id, &gs.text.font_key);
    if text.is_empty() {
        return;
    }
    let origin = gs.origin();
    let dx = gs.text.text_advance(&text);
    runs.push(gs.glyph_run(text, origin));
    gs.text.advance_x(dx);
}

/// Show a `TJ` array as one run. Numbers are kerning adjustments in
/// thousandths of a text-space unit; wide gaps become spaces.
fn show_array(
    arr: &[PdfValue],
    backend: &dyn PdfBackend,
    page_id: PageId,
    gs: &mut GraphicsState,
    runs: &mut Vec<GlyphRun>,
) {
    let mut buf = String::new();
    let mut origin = gs.origin();

    for elem in arr {
        match elem {
            PdfValue::Str(_) => {
                let fragment = decode_string(elem, backend, page_id, &gs.text.font_key);
                if buf.is_empty() {
                    origin = gs.origin();
                }
                let dx = gs.text.text_advance(&fragment);
                buf.push_str(&fragment);
                gs.text.advance_x(dx);
            }
            val => {
                if let Some(adj) = get_number_from_value(val) {
                    let text = &gs.text;
                    let dx = -adj / 1000.0 * text.font_size * text.horiz_scale;
                    let gap = text.font_size
                        * APPROX_CHAR_WIDTH_RATIO
                        * text.horiz_scale
                        * KERNING_SPACE_RATIO;
                    if dx > gap && !buf.is_empty() && !buf.ends_with(' ') {
                        buf.push(' ');
                    }
                    gs.text.advance_x(dx);
                }
            }
        }
    }

    let trimmed = buf.trim_end();
    if !trimmed.is_empty() {
        runs.push(gs.glyph_run(trimmed.to_string(), origin));
    }
}

// ---------------------------------------------------------------------------
// Public API: conversion to raw spans
// ---------------------------------------------------------------------------

/// Convert a page's glyph runs into raw spans with top-left boxes.
///
/// Box edges are measured from the MediaBox origin and clamped to the page.
/// Runs whose cleaned text is blank are dropped.
pub fn to_raw_page(number: usize, page_box: PageBox, runs: Vec<GlyphRun>) -> RawPage {
    let width = f64::from(page_box.width());
    let height = f64::from(page_box.height());

    let spans = merge_runs(runs)
        .into_iter()
        .filter_map(|run| {
            let text = clean_span_text(&run.text);
            if text.trim().is_empty() {
                return None;
            }

            let font_size = f64::from(run.font_size);
            let left = f64::from(run.x - page_box.llx);
            let right = left + f64::from(run.width);
            let baseline = f64::from(page_box.ury - run.y);
            let top = baseline - ASCENT_RATIO * font_size;
            let bottom = baseline + DESCENT_RATIO * font_size;

            Some(RawSpan {
                text,
                font_size,
                flags: run.flags,
                bbox: BBox::new(
                    left.clamp(0.0, width),
                    top.clamp(0.0, height),
                    right.clamp(0.0, width),
                    bottom.clamp(0.0, height),
                ),
            })
        })
        .collect();

    RawPage {
        number,
        width,
        height,
        spans,
    }
}

/// Join consecutive runs that continue one another in the same font on the
/// same baseline. Touching runs are concatenated; a gap of up to two ems
/// becomes a single space.
pub fn merge_runs(runs: Vec<GlyphRun>) -> Vec<GlyphRun> {
    let mut merged: Vec<GlyphRun> = Vec::with_capacity(runs.len());

    for run in runs {
        if let Some(prev) = merged.last_mut() {
            let prev_end = prev.x + prev.width;
            let gap = run.x - prev_end;

            if prev.continues(&run) && gap > -prev.font_size && gap < prev.font_size * 2.0 {
                let spaced = prev.text.ends_with(char::is_whitespace)
                    || run.text.starts_with(char::is_whitespace);
                if gap >= MIN_WORD_GAP && !spaced {
                    prev.text.push(' ');
                }
                prev.text.push_str(&run.text);
                prev.width = (run.x + run.width).max(prev_end) - prev.x;
                continue;
            }
        }

        merged.push(run);
    }

    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

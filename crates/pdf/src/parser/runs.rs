//! Text-run extraction from page content streams.
//!
//! Walks a page's operators with a reduced PDF graphics/text state machine
//! and emits one [`TextRun`] per text-showing operator (`Tj`, `TJ`, `'`,
//! `"`). Each run carries the text rendering matrix at its start, its
//! advance width and height in user space, the font, and the fill color in
//! effect.
//!
//! ```text
//! content ops  ->  (graphics state + text state)  ->  TextRun[]
//! ```

use super::backend::{
    decode_text_simple, get_number_from_value, FontResource, PageId, PdfBackend, PdfValue,
};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A run of text as drawn by a single show operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Glyph space to user space at the start of the run, font size included:
    /// `[a, b, c, d, e, f]` with the origin at (`e`, `f`), bottom-left based.
    pub transform: [f32; 6],
    /// Advance width in user space.
    pub width: f32,
    /// Rendered font height in user space.
    pub height: f32,
    /// Base font name without subset tag, or the resource key if unresolved.
    pub font_name: String,
    /// Size operand of the last `Tf`.
    pub font_size: f32,
    /// Non-stroking color as RGB in `[0, 1]`, when one was set.
    pub color: Option<[f32; 3]>,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Width of a glyph relative to the font size when the font declares no
/// widths.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Glyph width (in 1/1000 units) for codes missing from a `/Widths` array.
const MISSING_GLYPH_WIDTH: f32 = 500.0;

/// Kerning gaps in a `TJ` array wider than this fraction of an average glyph
/// become a space in the run text.
const TJ_SPACE_FACTOR: f32 = 0.3;

// ---------------------------------------------------------------------------
// Matrices
// ---------------------------------------------------------------------------

type Matrix = [f32; 6];

const IDENTITY_MATRIX: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `a x b` in PDF row-vector convention (apply `a` first, then `b`).
fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn matrix_operands(operands: &[PdfValue]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = [0.0; 6];
    for (slot, val) in m.iter_mut().zip(operands) {
        *slot = get_number_from_value(val)?;
    }
    Some(m)
}

// ---------------------------------------------------------------------------
// Internal: graphics and text state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: Option<[f32; 3]>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY_MATRIX,
            fill: None,
        }
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font: Option<FontResource>,
    font_size: f32,
    text_matrix: Matrix,
    line_matrix: Matrix,
    /// Tz / 100.
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font: None,
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn font_name(&self) -> String {
        self.font
            .as_ref()
            .and_then(|f| f.family())
            .map(String::from)
            .unwrap_or_else(|| String::from_utf8_lossy(&self.font_key).into_owned())
    }

    /// Move along the baseline by `dx` text-space units.
    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// Text rendering matrix: glyph space to user space.
    fn rendering_matrix(&self, ctm: &Matrix) -> Matrix {
        let params = [
            self.font_size * self.horiz_scale,
            0.0,
            0.0,
            self.font_size,
            0.0,
            self.text_rise,
        ];
        multiply(&params, &multiply(&self.text_matrix, ctm))
    }

    /// Horizontal scale from text space to user space.
    fn user_x_scale(&self, ctm: &Matrix) -> f32 {
        let m = multiply(&self.text_matrix, ctm);
        (m[0].powi(2) + m[1].powi(2)).sqrt()
    }

    /// Horizontal displacement, in unscaled text space, of showing `bytes`.
    fn string_advance(&self, bytes: &[u8], text: &str) -> f32 {
        let simple_widths = self
            .font
            .as_ref()
            .filter(|f| !f.is_composite())
            .and_then(|f| f.widths.as_ref());

        let total = match simple_widths {
            Some(widths) => bytes
                .iter()
                .map(|&code| {
                    let w = widths.width_of(code).unwrap_or(MISSING_GLYPH_WIDTH) / 1000.0;
                    let ws = if code == b' ' { self.word_spacing } else { 0.0 };
                    w * self.font_size + self.char_spacing + ws
                })
                .sum::<f32>(),
            None => text
                .chars()
                .map(|ch| {
                    let ws = if ch == ' ' { self.word_spacing } else { 0.0 };
                    self.font_size * APPROX_CHAR_WIDTH_RATIO + self.char_spacing + ws
                })
                .sum::<f32>(),
        };
        total * self.horiz_scale
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Walk one page's content stream and return its text runs in drawing order.
///
/// | Operator | Action |
/// |----------|--------|
/// | `q` `Q` `cm` | Save/restore graphics state, concat CTM |
/// | `g` `rg` `k` `sc` `scn` | Set non-stroking color |
/// | `BT` `ET` | Begin/end text object |
/// | `Tf` `Tm` `Td` `TD` `T*` `TL` | Font and positioning |
/// | `Tc` `Tw` `Tz` `Ts` | Spacing, scaling, rise |
/// | `Tj` `TJ` `'` `"` | Show text |
pub fn extract_page_runs(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<TextRun>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_default();

    let mut gs = GraphicsState::default();
    let mut gs_stack: Vec<GraphicsState> = Vec::new();
    let mut ts = TextState::default();
    let mut runs: Vec<TextRun> = Vec::new();

    for op in &ops {
        let operands = op.operands.as_slice();
        let first_number = || operands.first().and_then(get_number_from_value);

        match op.operator.as_str() {
            // -- Graphics state --------------------------------------------
            "q" => gs_stack.push(gs.clone()),
            "Q" => {
                if let Some(saved) = gs_stack.pop() {
                    gs = saved;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operands(operands) {
                    gs.ctm = multiply(&m, &gs.ctm);
                }
            }
            "g" | "rg" | "k" | "sc" | "scn" => {
                gs.fill = fill_color(operands);
            }

            // -- Text objects ----------------------------------------------
            "BT" => {
                ts.text_matrix = IDENTITY_MATRIX;
                ts.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => {}

            "Tf" => handle_tf(operands, &fonts, &mut ts),
            "Tm" => {
                if let Some(m) = matrix_operands(operands) {
                    ts.text_matrix = m;
                    ts.line_matrix = m;
                }
            }
            "Td" | "TD" => {
                if operands.len() >= 2 {
                    let tx = get_number_from_value(&operands[0]).unwrap_or(0.0);
                    let ty = get_number_from_value(&operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        ts.leading = -ty;
                    }
                    ts.translate_line(tx, ty);
                }
            }
            "T*" => ts.translate_line(0.0, -ts.leading),
            "TL" => ts.leading = first_number().unwrap_or(ts.leading),
            "Tc" => ts.char_spacing = first_number().unwrap_or(ts.char_spacing),
            "Tw" => ts.word_spacing = first_number().unwrap_or(ts.word_spacing),
            "Tz" => ts.horiz_scale = first_number().map(|v| v / 100.0).unwrap_or(ts.horiz_scale),
            "Ts" => ts.text_rise = first_number().unwrap_or(ts.text_rise),

            // -- Show text -------------------------------------------------
            "Tj" => {
                if let Some(first) = operands.first() {
                    show_string(first, backend, page_id, &gs, &mut ts, &mut runs);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = operands.first() {
                    show_tj_array(arr, backend, page_id, &gs, &mut ts, &mut runs);
                }
            }
            "'" => {
                ts.translate_line(0.0, -ts.leading);
                if let Some(first) = operands.first() {
                    show_string(first, backend, page_id, &gs, &mut ts, &mut runs);
                }
            }
            "\"" => {
                if operands.len() >= 3 {
                    if let Some(aw) = get_number_from_value(&operands[0]) {
                        ts.word_spacing = aw;
                    }
                    if let Some(ac) = get_number_from_value(&operands[1]) {
                        ts.char_spacing = ac;
                    }
                    ts.translate_line(0.0, -ts.leading);
                    show_string(&operands[2], backend, page_id, &gs, &mut ts, &mut runs);
                }
            }

            _ => {}
        }
    }

    Ok(runs)
}

// ---------------------------------------------------------------------------
// Operator helpers
// ---------------------------------------------------------------------------

/// Non-stroking color from `g`/`rg`/`k`/`sc`/`scn` operands.
///
/// The component count selects the space: 1 gray, 3 RGB, 4 CMYK. Pattern
/// and other named colors yield `None`.
fn fill_color(operands: &[PdfValue]) -> Option<[f32; 3]> {
    let nums: Option<Vec<f32>> = operands.iter().map(get_number_from_value).collect();
    let c: Vec<f32> = nums?.into_iter().map(|v| v.clamp(0.0, 1.0)).collect();
    match c.as_slice() {
        [g] => Some([*g, *g, *g]),
        [r, g, b] => Some([*r, *g, *b]),
        [cy, m, y, k] => Some([
            (1.0 - cy) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        ]),
        _ => None,
    }
}

fn handle_tf(operands: &[PdfValue], fonts: &[FontResource], ts: &mut TextState) {
    if operands.len() < 2 {
        return;
    }
    let key = match &operands[0] {
        PdfValue::Name(n) => n.clone(),
        PdfValue::Str(s) => s.clone(),
        _ => return,
    };
    ts.font_size = get_number_from_value(&operands[1]).unwrap_or(0.0);
    ts.font = fonts.iter().find(|f| f.key == key).cloned();
    ts.font_key = key;
}

fn decode_operand(
    val: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    font_key: &[u8],
) -> Option<(Vec<u8>, String)> {
    match val {
        PdfValue::Str(bytes) => {
            let decoded = backend.decode_text(page_id, font_key, bytes);
            let text = if decoded.is_empty() {
                decode_text_simple(bytes)
            } else {
                decoded
            };
            Some((bytes.clone(), text))
        }
        _ => None,
    }
}

fn make_run(text: String, advance: f32, start: &TextState, gs: &GraphicsState) -> TextRun {
    let transform = start.rendering_matrix(&gs.ctm);
    TextRun {
        text,
        transform,
        width: (advance * start.user_x_scale(&gs.ctm)).abs(),
        height: (transform[2].powi(2) + transform[3].powi(2)).sqrt(),
        font_name: start.font_name(),
        font_size: start.font_size,
        color: gs.fill,
    }
}

/// `Tj`-style show: one run, then advance past it.
fn show_string(
    operand: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    gs: &GraphicsState,
    ts: &mut TextState,
    runs: &mut Vec<TextRun>,
) {
    let Some((bytes, text)) = decode_operand(operand, backend, page_id, &ts.font_key) else {
        return;
    };
    let advance = ts.string_advance(&bytes, &text);
    if !text.is_empty() {
        runs.push(make_run(text, advance, ts, gs));
    }
    ts.advance_x(advance);
}

/// `TJ` array: strings and kerning adjustments merged into one run.
///
/// Numbers are in thousandths of text space; negative values move right.
/// Gaps wide enough to look like word breaks insert a space.
fn show_tj_array(
    arr: &[PdfValue],
    backend: &dyn PdfBackend,
    page_id: PageId,
    gs: &GraphicsState,
    ts: &mut TextState,
    runs: &mut Vec<TextRun>,
) {
    let mut start: Option<TextState> = None;
    let mut buf = String::new();
    // Advance from the run start to the end of the last string shown.
    let mut advance = 0.0;
    let mut pending = 0.0;

    for elem in arr {
        if let Some((bytes, fragment)) = decode_operand(elem, backend, page_id, &ts.font_key) {
            if start.is_none() {
                start = Some(ts.clone());
            }
            buf.push_str(&fragment);
            let dx = ts.string_advance(&bytes, &fragment);
            ts.advance_x(dx);
            advance += pending + dx;
            pending = 0.0;
        } else if let Some(adj) = get_number_from_value(elem) {
            let dx = -adj / 1000.0 * ts.font_size * ts.horiz_scale;
            let gap_threshold =
                ts.font_size * APPROX_CHAR_WIDTH_RATIO * ts.horiz_scale * TJ_SPACE_FACTOR;
            if dx > gap_threshold && !buf.is_empty() && !buf.ends_with(' ') {
                buf.push(' ');
            }
            ts.advance_x(dx);
            if start.is_some() {
                pending += dx;
            }
        }
    }

    let text = buf.trim_end().to_string();
    if let Some(start) = start.filter(|_| !text.is_empty()) {
        runs.push(make_run(text, advance, &start, gs));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

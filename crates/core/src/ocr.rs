//! Optical recognition output and its mapping to token fields.
//!
//! The engine itself lives in the shell; this module only knows the shape of
//! its output ([`Recognition`]) and how Tesseract prints it as TSV.

use serde::{Deserialize, Serialize};

use crate::field::{Bounds, FieldSource, FontWeight, RawField};
use crate::ids::IdSource;
use crate::token::{find_tokens, proportional_span};

/// Word boxes taller than this many pixels are considered bold.
const OCR_BOLD_HEIGHT: f32 = 20.0;

/// Word box in pixel space: top-left (`x0`, `y0`), bottom-right (`x1`, `y1`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WordBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl WordBox {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    pub text: String,
    pub bbox: WordBox,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recognition {
    pub words: Vec<RecognizedWord>,
    pub full_text: String,
}

/// One `ocr` field per token found in a recognized word.
///
/// Token search runs over the whole word string, so a word such as
/// `{NAME},` still yields `NAME`. Font size is the word box height; boxes
/// with no area are skipped.
pub fn fields_from_recognition(recognition: &Recognition, mut ids: impl IdSource) -> Vec<RawField> {
    let mut fields = Vec::new();

    for word in &recognition.words {
        let bbox = word.bbox;
        let (width, height) = (bbox.width(), bbox.height());
        if !(width > 0.0 && height > 0.0) {
            continue;
        }

        for m in find_tokens(&word.text) {
            let (offset, span) = proportional_span(&word.text, &m, width);
            let mut field = RawField::new(
                ids.next_id(),
                m.name,
                FieldSource::Ocr,
                Bounds::new(bbox.x0 + offset, bbox.y0, span, height),
            );
            field.sample = Some(m.literal.to_string());
            field.font_size = Some(height);
            field.font_weight = Some(if height > OCR_BOLD_HEIGHT {
                FontWeight::Bold
            } else {
                FontWeight::Normal
            });
            fields.push(field);
        }
    }

    fields
}

// ---------------------------------------------------------------------------
// Tesseract TSV
// ---------------------------------------------------------------------------

/// Tesseract's word level in TSV output.
const TSV_WORD_LEVEL: u32 = 5;

/// Parse `tesseract ... tsv` output.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num, left,
/// top, width, height, conf, text. Only word rows with non-blank text are
/// kept. Rows that fail to parse are skipped.
pub fn parse_tesseract_tsv(tsv: &str) -> Recognition {
    let mut words = Vec::new();
    let mut full_text = String::new();
    let mut current_line: Option<(u32, u32, u32, u32)> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        let Ok(level) = cols[0].trim().parse::<u32>() else {
            continue;
        };
        if level != TSV_WORD_LEVEL {
            continue;
        }
        let text = cols[11..].join("\t");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let nums: Option<Vec<f32>> = cols[6..10]
            .iter()
            .map(|c| c.trim().parse::<f32>().ok())
            .collect();
        let Some(nums) = nums else {
            continue;
        };
        let line_key: Option<Vec<u32>> = cols[1..5]
            .iter()
            .map(|c| c.trim().parse::<u32>().ok())
            .collect();
        let line_key = line_key.map(|k| (k[0], k[1], k[2], k[3]));

        if !full_text.is_empty() {
            if line_key == current_line {
                full_text.push(' ');
            } else {
                full_text.push('\n');
            }
        }
        full_text.push_str(text);
        current_line = line_key;

        let (left, top, width, height) = (nums[0], nums[1], nums[2], nums[3]);
        words.push(RecognizedWord {
            text: text.to_string(),
            bbox: WordBox {
                x0: left,
                y0: top,
                x1: left + width,
                y1: top + height,
            },
        });
    }

    Recognition { words, full_text }
}

//! Placeholder field schema shared by every detector, the normalizer, and
//! downstream editors/renderers.
//!
//! Two shapes exist:
//!
//! - [`RawField`]: what a detector (or a manual edit) produces. Geometry and
//!   provenance are always known; style attributes may be missing.
//! - [`Field`]: the normalized shape with every style attribute populated.
//!   Only [`crate::normalize`] builds these from raw input.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::token::is_valid_token_name;

/// Reserved name rendered as a scannable verification code.
pub const QR_CODE: &str = "QR_CODE";

/// Reserved name rendered as the generated certificate identifier.
pub const CERT_ID: &str = "CERT_ID";

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Rendering kind of a field. Always derived from the field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Qr,
}

impl FieldKind {
    /// `QR_CODE` and `CERT_ID` are `qr`; every other name is `text`.
    pub fn for_name(name: &str) -> Self {
        if name == QR_CODE || name == CERT_ID {
            FieldKind::Qr
        } else {
            FieldKind::Text
        }
    }
}

/// Which strategy created the field. Never changes after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldSource {
    #[serde(rename = "pdf-text")]
    PdfText,
    #[serde(rename = "ocr")]
    Ocr,
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "color")]
    Color,
}

impl FieldSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldSource::PdfText => "pdf-text",
            FieldSource::Ocr => "ocr",
            FieldSource::Manual => "manual",
            FieldSource::Color => "color",
        }
    }
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CSS-style font weight: `normal`, `bold`, or a numeric weight `100`..`900`.
///
/// Serialized as a string so the JSON shape matches `"700"` rather than `700`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
    Numeric(u16),
}

impl TryFrom<String> for FontWeight {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "normal" => Ok(FontWeight::Normal),
            "bold" => Ok(FontWeight::Bold),
            other => match other.parse::<u16>() {
                Ok(w) if (100..=900).contains(&w) && w % 100 == 0 => Ok(FontWeight::Numeric(w)),
                _ => Err(FieldError::InvalidFontWeight(value)),
            },
        }
    }
}

impl From<FontWeight> for String {
    fn from(value: FontWeight) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FontWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontWeight::Normal => write!(f, "normal"),
            FontWeight::Bold => write!(f, "bold"),
            FontWeight::Numeric(w) => write!(f, "{}", w),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// An axis-aligned box in raster space (origin top-left, Y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A box with no area cannot be drawn into and is never emitted.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Secondary box kept for future masking; stored, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Invalid token name '{0}' (expected uppercase letters and underscores only)")]
    InvalidName(String),
    #[error("Invalid font weight '{0}'")]
    InvalidFontWeight(String),
}

// ---------------------------------------------------------------------------
// Raw (detector output) and normalized fields
// ---------------------------------------------------------------------------

/// A field candidate as produced by a detector or authored by hand.
///
/// Style attributes are optional; [`crate::normalize::normalize_fields`]
/// fills the gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawField {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<FontStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
    pub source: FieldSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_mask: Option<MaskBox>,
}

impl RawField {
    /// A bare candidate: geometry and provenance, no style.
    pub fn new(id: String, name: impl Into<String>, source: FieldSource, bounds: Bounds) -> Self {
        Self {
            id,
            name: name.into(),
            sample: None,
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            font_family: None,
            font_size: None,
            font_weight: None,
            font_style: None,
            text_align: None,
            text_color: None,
            line_height: None,
            source,
            bbox_mask: None,
        }
    }

    /// A user-placed field. The name must satisfy the token grammar.
    pub fn manual(id: String, name: &str, bounds: Bounds) -> Result<Self, FieldError> {
        if !is_valid_token_name(name) {
            return Err(FieldError::InvalidName(name.to_string()));
        }
        Ok(Self::new(id, name, FieldSource::Manual, bounds))
    }

    /// The kind is never stored on a raw field; it follows the name.
    pub fn kind(&self) -> FieldKind {
        FieldKind::for_name(&self.name)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }
}

/// A normalized field: every style attribute is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub text_align: TextAlign,
    pub text_color: String,
    pub line_height: f32,
    pub source: FieldSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_mask: Option<MaskBox>,
}

impl Field {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }
}

impl From<Field> for RawField {
    fn from(field: Field) -> Self {
        Self {
            id: field.id,
            name: field.name,
            sample: field.sample,
            x: field.x,
            y: field.y,
            width: field.width,
            height: field.height,
            font_family: Some(field.font_family),
            font_size: Some(field.font_size),
            font_weight: Some(field.font_weight),
            font_style: Some(field.font_style),
            text_align: Some(field.text_align),
            text_color: Some(field.text_color),
            line_height: Some(field.line_height),
            source: field.source,
            bbox_mask: field.bbox_mask,
        }
    }
}

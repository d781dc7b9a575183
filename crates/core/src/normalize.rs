//! Field normalization: fill every missing style attribute with its default.
//!
//! Normalization is pure and idempotent. It never reorders, renames or
//! deduplicates fields; duplicates across detectors are preserved as-is.

use crate::field::{Field, FieldKind, RawField};

pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const DEFAULT_FONT_SIZE: f32 = 16.0;
pub const DEFAULT_TEXT_COLOR: &str = "#000000";
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

fn positive(value: Option<f32>) -> Option<f32> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}

/// Normalize a single field.
///
/// Non-positive sizes and blank strings count as missing. The line height
/// default uses the field's own (possibly defaulted) font size.
pub fn normalize_field(raw: &RawField) -> Field {
    let font_size = positive(raw.font_size).unwrap_or(DEFAULT_FONT_SIZE);
    let line_height = positive(raw.line_height).unwrap_or(font_size * LINE_HEIGHT_FACTOR);

    Field {
        id: raw.id.clone(),
        name: raw.name.clone(),
        kind: FieldKind::for_name(&raw.name),
        sample: raw.sample.clone(),
        x: raw.x,
        y: raw.y,
        width: raw.width,
        height: raw.height,
        font_family: non_empty(&raw.font_family).unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
        font_size,
        font_weight: raw.font_weight.unwrap_or_default(),
        font_style: raw.font_style.unwrap_or_default(),
        text_align: raw.text_align.unwrap_or_default(),
        text_color: non_empty(&raw.text_color).unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string()),
        line_height,
        source: raw.source,
        bbox_mask: raw.bbox_mask,
    }
}

/// Normalize a list of fields, preserving order.
pub fn normalize_fields(raw: &[RawField]) -> Vec<Field> {
    raw.iter().map(normalize_field).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Bounds, FieldSource, FontStyle, FontWeight, MaskBox, TextAlign};
    use proptest::prelude::*;

    fn raw(name: &str) -> RawField {
        RawField::new(
            "f1".into(),
            name,
            FieldSource::Manual,
            Bounds::new(1.0, 2.0, 30.0, 12.0),
        )
    }

    #[test]
    fn test_defaults_are_filled() {
        let field = normalize_field(&raw("NAME"));
        assert_eq!(field.font_family, "Arial");
        assert_eq!(field.font_size, 16.0);
        assert_eq!(field.font_weight, FontWeight::Normal);
        assert_eq!(field.font_style, FontStyle::Normal);
        assert_eq!(field.text_align, TextAlign::Left);
        assert_eq!(field.text_color, "#000000");
        assert!((field.line_height - 19.2).abs() < 1e-4);
        assert_eq!(field.kind, FieldKind::Text);
    }

    #[test]
    fn test_line_height_follows_own_font_size() {
        let mut input = raw("NAME");
        input.font_size = Some(30.0);
        let field = normalize_field(&input);
        assert!((field.line_height - 36.0).abs() < 1e-4);
    }

    #[test]
    fn test_present_values_are_kept() {
        let mut input = raw("DATE");
        input.font_family = Some("Georgia".into());
        input.font_weight = Some(FontWeight::Numeric(600));
        input.font_style = Some(FontStyle::Italic);
        input.text_align = Some(TextAlign::Center);
        input.text_color = Some("#ff0000".into());
        input.line_height = Some(40.0);
        input.bbox_mask = Some(MaskBox {
            x: 0.0,
            y: 0.0,
            w: 5.0,
            h: 5.0,
        });
        let field = normalize_field(&input);
        assert_eq!(field.font_family, "Georgia");
        assert_eq!(field.font_weight, FontWeight::Numeric(600));
        assert_eq!(field.font_style, FontStyle::Italic);
        assert_eq!(field.text_align, TextAlign::Center);
        assert_eq!(field.text_color, "#ff0000");
        assert_eq!(field.line_height, 40.0);
        assert!(field.bbox_mask.is_some());
    }

    #[test]
    fn test_zero_font_size_and_blank_family_use_defaults() {
        let mut input = raw("NAME");
        input.font_size = Some(0.0);
        input.font_family = Some("  ".into());
        let field = normalize_field(&input);
        assert_eq!(field.font_size, 16.0);
        assert_eq!(field.font_family, "Arial");
    }

    #[test]
    fn test_kind_is_rederived_from_name() {
        assert_eq!(normalize_field(&raw("QR_CODE")).kind, FieldKind::Qr);
        assert_eq!(normalize_field(&raw("CERT_ID")).kind, FieldKind::Qr);
        assert_eq!(normalize_field(&raw("COURSE")).kind, FieldKind::Text);
    }

    #[test]
    fn test_duplicates_and_order_preserved() {
        let mut second = raw("NAME");
        second.id = "f2".into();
        let fields = normalize_fields(&[raw("NAME"), second]);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].id, "f1");
        assert_eq!(fields[1].id, "f2");
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = vec![raw("NAME")];
        let before = input.clone();
        let _ = normalize_fields(&input);
        assert_eq!(input, before);
    }

    fn arb_raw_field() -> impl Strategy<Value = RawField> {
        (
            "[A-Z_]{1,8}",
            0.0f32..500.0,
            0.0f32..500.0,
            proptest::option::of(-5.0f32..80.0),
            proptest::option::of(-5.0f32..100.0),
            proptest::option::of(prop_oneof![Just(""), Just("Arial"), Just("Times New Roman")]),
            proptest::option::of(prop_oneof![
                Just(FontWeight::Normal),
                Just(FontWeight::Bold),
                Just(FontWeight::Numeric(300)),
            ]),
            proptest::option::of(prop_oneof![Just(""), Just("#123abc")]),
        )
            .prop_map(|(name, x, y, size, lh, family, weight, color)| {
                let mut field = RawField::new(
                    "id".into(),
                    name,
                    FieldSource::Ocr,
                    Bounds::new(x, y, 10.0, 10.0),
                );
                field.font_size = size;
                field.line_height = lh;
                field.font_family = family.map(String::from);
                field.font_weight = weight;
                field.text_color = color.map(String::from);
                field
            })
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(fields in proptest::collection::vec(arb_raw_field(), 0..8)) {
            let once = normalize_fields(&fields);
            let again: Vec<RawField> = once.iter().cloned().map(RawField::from).collect();
            prop_assert_eq!(normalize_fields(&again), once);
        }
    }
}

//! Embedded-text token extraction.
//!
//! Turns text runs into `pdf-text` fields. Run positions are in PDF user
//! space (origin bottom-left, Y up); fields are in viewport space (origin
//! top-left, Y down) at scale 1.0, so the Y axis is flipped against the top
//! of the page's visible box (CropBox, else MediaBox).

use certigenie_core::field::{Bounds, FieldSource, FontWeight, RawField};
use certigenie_core::ids::IdSource;
use certigenie_core::normalize::LINE_HEIGHT_FACTOR;
use certigenie_core::token::{find_tokens, proportional_span};

use crate::parser::backend::{PageBox, PdfBackend};
use crate::parser::runs::{extract_page_runs, TextRun};
use crate::PdfError;

const FALLBACK_FONT_SIZE: f32 = 16.0;
const FALLBACK_WIDTH: f32 = 100.0;
const FALLBACK_HEIGHT: f32 = 20.0;

/// Runs rendered larger than this are marked bold.
const PDF_BOLD_SIZE: f32 = 20.0;

/// The text runs of one page together with its visible page box.
#[derive(Debug, Clone)]
pub struct PageRuns {
    /// 1-based page number.
    pub page: u32,
    pub page_box: PageBox,
    pub runs: Vec<TextRun>,
}

/// Runs for every page, in page order.
pub fn extract_all_pages(backend: &dyn PdfBackend) -> Result<Vec<PageRuns>, PdfError> {
    backend
        .pages()
        .into_iter()
        .map(|(page, page_id)| {
            Ok(PageRuns {
                page,
                page_box: backend.page_box(page_id)?,
                runs: extract_page_runs(backend, page_id)?,
            })
        })
        .collect()
}

/// `#rrggbb` from RGB components in `[0, 1]`.
pub fn rgb_to_hex(rgb: [f32; 3]) -> String {
    let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("#{:02x}{:02x}{:02x}", byte(rgb[0]), byte(rgb[1]), byte(rgb[2]))
}

fn positive(value: f32) -> Option<f32> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// One field per token match in each run of a page.
///
/// A run holding several tokens (or a token plus other text) yields one
/// field per match, each spanning its proportional share of the run width.
pub fn fields_from_runs(
    runs: &[TextRun],
    page_box: &PageBox,
    ids: &mut impl IdSource,
) -> Vec<RawField> {
    let mut fields = Vec::new();

    for run in runs {
        let matches = find_tokens(&run.text);
        if matches.is_empty() {
            continue;
        }

        let font_size = positive(run.height)
            .or_else(|| positive(run.font_size))
            .unwrap_or(FALLBACK_FONT_SIZE);
        let run_width = positive(run.width).unwrap_or(FALLBACK_WIDTH);
        let height = positive(run.height).unwrap_or(FALLBACK_HEIGHT);
        let x = run.transform[4] - page_box.llx;
        let y = page_box.ury - run.transform[5];

        for m in matches {
            let (offset, width) = proportional_span(&run.text, &m, run_width);
            let bounds = Bounds::new(x + offset, y, width, height);
            if bounds.is_degenerate() {
                continue;
            }

            let mut field = RawField::new(ids.next_id(), m.name, FieldSource::PdfText, bounds);
            field.sample = Some(m.literal.to_string());
            field.font_family = Some(run.font_name.clone()).filter(|f| !f.is_empty());
            field.font_size = Some(font_size);
            field.font_weight = Some(if font_size > PDF_BOLD_SIZE {
                FontWeight::Bold
            } else {
                FontWeight::Normal
            });
            field.text_color = run.color.map(rgb_to_hex);
            field.line_height = Some(font_size * LINE_HEIGHT_FACTOR);
            fields.push(field);
        }
    }

    fields
}

/// Token fields across every page, in page order.
pub fn fields_from_pages(pages: &[PageRuns], mut ids: impl IdSource) -> Vec<RawField> {
    pages
        .iter()
        .flat_map(|page| fields_from_runs(&page.runs, &page.page_box, &mut ids))
        .collect()
}

#[cfg(test)]
mod tests {
    use certigenie_core::field::FieldKind;
    use certigenie_core::ids::SequentialIds;
    use proptest::prelude::*;

    use super::*;
    use crate::parser::backend::PdfValue;
    use crate::parser::runs::tests::{bt_op, et_op, make_op, td_op, tf_op, tj_op, MockBackend};

    fn run(text: &str, x: f32, y: f32, size: f32) -> TextRun {
        TextRun {
            text: text.to_string(),
            transform: [size, 0.0, 0.0, size, x, y],
            width: text.chars().count() as f32 * size * 0.5,
            height: size,
            font_name: "Helvetica".to_string(),
            font_size: size,
            color: None,
        }
    }

    fn page(height: f32) -> PageBox {
        PageBox {
            llx: 0.0,
            lly: 0.0,
            urx: 600.0,
            ury: height,
        }
    }

    fn fields(runs: &[TextRun], height: f32) -> Vec<RawField> {
        fields_from_runs(runs, &page(height), &mut SequentialIds::default())
    }

    fn backend_fields(backend: &MockBackend) -> Vec<RawField> {
        let pages = extract_all_pages(backend).unwrap();
        fields_from_pages(&pages, SequentialIds::default())
    }

    #[test]
    fn test_y_is_flipped_against_viewport_height() {
        let f = fields(&[run("{NAME}", 50.0, 700.0, 12.0)], 800.0);
        assert_eq!(f[0].y, 100.0);
        assert_eq!(f[0].x, 50.0);
    }

    #[test]
    fn test_media_box_origin_is_respected() {
        let page_box = PageBox {
            llx: 20.0,
            lly: 40.0,
            urx: 620.0,
            ury: 840.0,
        };
        let f = fields_from_runs(
            &[run("{NAME}", 70.0, 740.0, 12.0)],
            &page_box,
            &mut SequentialIds::default(),
        );
        assert_eq!((f[0].x, f[0].y), (50.0, 100.0));
    }

    #[test]
    fn test_run_above_page_gives_negative_y() {
        let f = fields(&[run("{NAME}", 100.0, 750.0, 18.0)], 600.0);
        assert_eq!(f[0].y, -150.0);
    }

    #[test]
    fn test_style_from_run() {
        let mut r = run("{TITLE}", 0.0, 500.0, 24.0);
        r.color = Some([1.0, 0.0, 0.5]);
        let f = fields(&[r], 800.0);
        assert_eq!(f[0].font_size, Some(24.0));
        assert_eq!(f[0].font_weight, Some(FontWeight::Bold));
        assert_eq!(f[0].text_color.as_deref(), Some("#ff0080"));
        assert_eq!(f[0].font_family.as_deref(), Some("Helvetica"));
        assert!((f[0].line_height.unwrap() - 28.8).abs() < 1e-4);
        assert_eq!(f[0].source, FieldSource::PdfText);
        assert_eq!(f[0].sample.as_deref(), Some("{TITLE}"));
    }

    #[test]
    fn test_fallbacks_for_missing_metrics() {
        let mut r = run("{NAME}", 0.0, 500.0, 0.0);
        r.width = 0.0;
        r.font_name = String::new();
        let f = fields(&[r], 800.0);
        assert_eq!(f[0].font_size, Some(16.0));
        assert_eq!(f[0].width, 100.0);
        assert_eq!(f[0].height, 20.0);
        assert!(f[0].font_family.is_none());
        assert_eq!(f[0].font_weight, Some(FontWeight::Normal));
    }

    #[test]
    fn test_font_size_falls_back_to_tf_size() {
        let mut r = run("{NAME}", 0.0, 500.0, 12.0);
        r.height = 0.0;
        r.font_size = 22.0;
        let f = fields(&[r], 800.0);
        assert_eq!(f[0].font_size, Some(22.0));
        assert_eq!(f[0].font_weight, Some(FontWeight::Bold));
        assert_eq!(f[0].height, 20.0);
    }

    #[test]
    fn test_partial_match_is_sliced() {
        // "To: {NAME}" is 10 chars at 10pt -> 50 wide; token starts at char 4
        let f = fields(&[run("To: {NAME}", 100.0, 500.0, 10.0)], 800.0);
        assert_eq!(f.len(), 1);
        assert!((f[0].x - 120.0).abs() < 1e-4);
        assert!((f[0].width - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_reserved_names() {
        let f = fields(
            &[run("{QR_CODE}", 0.0, 100.0, 10.0), run("{COURSE}", 0.0, 200.0, 10.0)],
            800.0,
        );
        assert_eq!(f[0].kind(), FieldKind::Qr);
        assert_eq!(f[1].kind(), FieldKind::Text);
    }

    #[test]
    fn test_pages_share_one_id_sequence() {
        let pages = vec![
            PageRuns {
                page: 1,
                page_box: page(800.0),
                runs: vec![run("{NAME}", 10.0, 700.0, 12.0)],
            },
            PageRuns {
                page: 2,
                page_box: page(600.0),
                runs: vec![run("{DATE}", 10.0, 500.0, 12.0)],
            },
        ];
        let f = fields_from_pages(&pages, SequentialIds::default());
        let ids: Vec<_> = f.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["field_1", "field_2"]);
        assert_eq!((f[0].y, f[1].y), (100.0, 100.0));
    }

    #[test]
    fn test_rgb_to_hex_rounds() {
        assert_eq!(rgb_to_hex([0.0, 0.0, 0.0]), "#000000");
        assert_eq!(rgb_to_hex([1.0, 1.0, 1.0]), "#ffffff");
        assert_eq!(rgb_to_hex([0.5, 0.2, 0.998]), "#8033fe");
    }

    #[test]
    fn test_end_to_end_through_backend() {
        let backend = MockBackend::single_page(
            vec![
                bt_op(),
                tf_op(b"F1", 18.0),
                td_op(100.0, 750.0),
                tj_op(b"{NAME}"),
                et_op(),
            ],
            800.0,
        );
        let f = backend_fields(&backend);
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].name, "NAME");
        assert_eq!(f[0].kind(), FieldKind::Text);
        assert_eq!(f[0].y, 50.0);
        assert_eq!(f[0].font_weight, Some(FontWeight::Normal));
        assert_eq!(f[0].source, FieldSource::PdfText);
    }

    #[test]
    fn test_no_tokens_is_empty_not_error() {
        let backend = MockBackend::single_page(
            vec![bt_op(), tf_op(b"F1", 12.0), tj_op(b"Certificate of Completion"), et_op()],
            800.0,
        );
        assert!(backend_fields(&backend).is_empty());
    }

    #[test]
    fn test_tj_array_token_split_across_fragments() {
        let backend = MockBackend::single_page(
            vec![
                bt_op(),
                tf_op(b"F1", 12.0),
                make_op(
                    "TJ",
                    vec![PdfValue::Array(vec![
                        PdfValue::Str(b"{CERT".to_vec()),
                        PdfValue::Integer(-10),
                        PdfValue::Str(b"_ID}".to_vec()),
                    ])],
                ),
                et_op(),
            ],
            800.0,
        );
        let f = backend_fields(&backend);
        assert_eq!(f[0].name, "CERT_ID");
        assert_eq!(f[0].kind(), FieldKind::Qr);
    }

    proptest! {
        #[test]
        fn prop_every_token_in_a_run_is_extracted(
            names in proptest::collection::vec("[A-Z_]{1,6}", 1..5),
            filler in "[a-z ,:]{0,4}",
        ) {
            let text = names
                .iter()
                .map(|n| format!("{{{}}}", n))
                .collect::<Vec<_>>()
                .join(&filler);
            let f = fields(&[run(&text, 10.0, 400.0, 12.0)], 800.0);
            let found: Vec<_> = f.iter().map(|f| f.name.clone()).collect();
            prop_assert_eq!(found, names);
        }
    }
}

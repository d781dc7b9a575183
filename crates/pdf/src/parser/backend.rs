use std::collections::BTreeMap;

use lopdf::{self, content::Content};

use crate::PdfError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Advance widths of a simple font, in glyph units (1/1000 of text space).
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphWidths {
    pub first_char: u32,
    pub widths: Vec<f32>,
}

impl GlyphWidths {
    /// Width of a single-byte character code, if the font declares one.
    pub fn width_of(&self, code: u8) -> Option<f32> {
        let idx = (code as u32).checked_sub(self.first_char)?;
        self.widths.get(idx as usize).copied()
    }
}

/// A font entry from a page's `/Resources /Font` dictionary.
#[derive(Debug, Clone)]
pub struct FontResource {
    /// Resource key used by `Tf`, e.g. `b"F1"`.
    pub key: Vec<u8>,
    /// `/BaseFont`, subset tag included (`ABCDEF+Garamond`).
    pub base_font: Option<String>,
    /// `/Subtype`, e.g. `Type1`, `TrueType`, `Type0`.
    pub subtype: Option<String>,
    /// `/Encoding` when it is a name.
    pub encoding: Option<String>,
    /// `/FirstChar` + `/Widths` for simple fonts.
    pub widths: Option<GlyphWidths>,
}

impl FontResource {
    /// Composite fonts use multi-byte codes; per-byte widths do not apply.
    pub fn is_composite(&self) -> bool {
        self.subtype.as_deref() == Some("Type0")
    }

    /// Font family name with any subset tag stripped.
    pub fn family(&self) -> Option<&str> {
        let base = self.base_font.as_deref()?;
        match base.split_once('+') {
            Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => {
                Some(rest)
            }
            _ => Some(base),
        }
    }
}

/// Visible page bounds in default user space: the `/CropBox` clipped to the
/// `/MediaBox`, or the MediaBox alone when no CropBox is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    /// US Letter; used when a page declares no usable MediaBox.
    pub const LETTER: PageBox = PageBox {
        llx: 0.0,
        lly: 0.0,
        urx: 612.0,
        ury: 792.0,
    };

    /// From a `[x1 y1 x2 y2]` rectangle given in any corner order.
    pub fn from_rect(n: [f32; 4]) -> Self {
        Self {
            llx: n[0].min(n[2]),
            lly: n[1].min(n[3]),
            urx: n[0].max(n[2]),
            ury: n[1].max(n[3]),
        }
    }

    /// Overlap of two boxes, `None` when they share no area.
    pub fn intersect(&self, other: &PageBox) -> Option<PageBox> {
        let clipped = PageBox {
            llx: self.llx.max(other.llx),
            lly: self.lly.max(other.lly),
            urx: self.urx.min(other.urx),
            ury: self.ury.min(other.ury),
        };
        (clipped.urx > clipped.llx && clipped.ury > clipped.lly).then_some(clipped)
    }

    pub fn width(&self) -> f32 {
        (self.urx - self.llx).abs()
    }

    pub fn height(&self) -> f32 {
        (self.ury - self.lly).abs()
    }
}

/// A simplified, lopdf-independent representation of a PDF value.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(PageId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Extract an `f32` from a [`PdfValue`], accepting both `Integer` and `Real`.
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Convert a `lopdf::Object` into a [`PdfValue`]. Stream payloads are dropped.
pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
    let dict_entries = |dict: &lopdf::Dictionary| -> Vec<(Vec<u8>, PdfValue)> {
        dict.iter()
            .map(|(k, v)| (k.clone(), convert_object(v)))
            .collect()
    };
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(dict_entries(dict)),
        lopdf::Object::Stream(stream) => PdfValue::Dict(dict_entries(&stream.dict)),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

/// Best-effort decoding of raw PDF string bytes.
///
/// UTF-16BE with BOM first, then UTF-8, then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let code_units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&code_units);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Document reader used by the text-run walker.
///
/// Kept as a trait so the walker can be driven by pre-decoded operations in
/// tests.
pub trait PdfBackend {
    /// 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Fonts referenced by the page's resources.
    fn page_fonts(&self, page: PageId) -> Result<Vec<FontResource>, PdfError>;

    /// Visible page box (CropBox clipped to MediaBox), inherited from the page tree.
    fn page_box(&self, page: PageId) -> Result<PageBox, PdfError>;

    /// Concatenated, decompressed content stream bytes.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    /// Tokenize content-stream bytes into operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Decode the bytes of a text-showing operand for the given font.
    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// [`PdfBackend`] over an in-memory [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice. Encrypted files are refused.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    // -- private helpers ----------------------------------------------------

    fn resolve<'a>(&'a self, obj: &'a lopdf::Object) -> Option<&'a lopdf::Object> {
        match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn number(&self, obj: &lopdf::Object) -> Option<f32> {
        match self.resolve(obj)? {
            lopdf::Object::Integer(i) => Some(*i as f32),
            lopdf::Object::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Walk up the page tree to find an inheritable box (`MediaBox`, `CropBox`).
    fn find_box(&self, dict: &lopdf::Dictionary, key: &[u8], depth: usize) -> Option<PageBox> {
        if let Some(arr) = dict
            .get(key)
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_array().ok())
        {
            let nums: Option<Vec<f32>> = arr.iter().map(|o| self.number(o)).collect();
            if let Some([a, b, c, d]) = nums.as_deref() {
                return Some(PageBox::from_rect([*a, *b, *c, *d]));
            }
        }

        // Guard against cyclic Parent chains.
        if depth > 32 {
            return None;
        }
        let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent = self.doc.get_object(parent_id).ok()?.as_dict().ok()?;
        self.find_box(parent, key, depth + 1)
    }

    fn glyph_widths(&self, dict: &lopdf::Dictionary) -> Option<GlyphWidths> {
        let first_char = self.number(dict.get(b"FirstChar").ok()?)? as u32;
        let widths = self
            .resolve(dict.get(b"Widths").ok()?)?
            .as_array()
            .ok()?
            .iter()
            .map(|o| self.number(o).unwrap_or(0.0))
            .collect();
        Some(GlyphWidths { first_char, widths })
    }

    fn font_encoding_name(&self, page: PageId, font_key: &[u8]) -> Option<String> {
        let fonts = self.doc.get_page_fonts(page).ok()?;
        let font_dict = fonts.get(font_key)?;
        match font_dict.get(b"Encoding").ok()? {
            lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }
    }
}

fn name_entry(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontResource>, PdfError> {
        let fonts_map = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {}", e)))?;

        Ok(fonts_map
            .iter()
            .map(|(key, dict)| FontResource {
                key: key.clone(),
                base_font: name_entry(dict, b"BaseFont"),
                subtype: name_entry(dict, b"Subtype"),
                encoding: name_entry(dict, b"Encoding"),
                widths: self.glyph_widths(dict),
            })
            .collect())
    }

    fn page_box(&self, page: PageId) -> Result<PageBox, PdfError> {
        let page_dict = self
            .doc
            .get_object(page)
            .and_then(|o| o.as_dict())
            .map_err(|e| PdfError::Parse(format!("cannot get page dictionary: {}", e)))?;

        let media = self
            .find_box(page_dict, b"MediaBox", 0)
            .unwrap_or(PageBox::LETTER);

        // A CropBox that misses the MediaBox entirely is ignored.
        Ok(self
            .find_box(page_dict, b"CropBox", 0)
            .and_then(|crop| crop.intersect(&media))
            .unwrap_or(media))
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String {
        // Identity-H/V fonts carry 2-byte codes; try them as UTF-16BE.
        let identity = self
            .font_encoding_name(page, font_key)
            .is_some_and(|enc| enc.contains("Identity"));
        if identity && bytes.len() >= 2 && bytes.len() % 2 == 0 {
            let code_units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            let decoded = String::from_utf16_lossy(&code_units);
            if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                return decoded;
            }
        }

        decode_text_simple(bytes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object, Stream};

    fn font(base: Option<&str>, subtype: Option<&str>) -> FontResource {
        FontResource {
            key: b"F1".to_vec(),
            base_font: base.map(String::from),
            subtype: subtype.map(String::from),
            encoding: None,
            widths: None,
        }
    }

    fn rect(n: [i64; 4]) -> Vec<Object> {
        n.iter().map(|v| Object::Integer(*v)).collect()
    }

    /// One-page document with the given boxes on the page and on its parent.
    fn boxed_pdf(page_boxes: lopdf::Dictionary, parent_boxes: lopdf::Dictionary) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Contents" => Object::Reference(content_id),
        };
        for (key, value) in page_boxes.iter() {
            page.set(key.clone(), value.clone());
        }
        let page_id = doc.add_object(page);
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        };
        for (key, value) in parent_boxes.iter() {
            pages.set(key.clone(), value.clone());
        }
        let pages_id = doc.add_object(pages);
        if let Ok(dict) = doc.get_object_mut(page_id).and_then(|o| o.as_dict_mut()) {
            dict.set("Parent", Object::Reference(pages_id));
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn first_page_box(bytes: &[u8]) -> PageBox {
        let backend = LopdfBackend::load_bytes(bytes).unwrap();
        let page = backend.pages()[&1];
        backend.page_box(page).unwrap()
    }

    /// One-page document whose page inherits its MediaBox from the Pages node.
    fn inherited_box_pdf() -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "QWERTY+Garamond-Bold",
            "FirstChar" => Object::Integer(65),
            "Widths" => vec![Object::Integer(600), Object::Integer(700)],
        });
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        });
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(420),
                Object::Integer(595),
            ],
        });
        if let Ok(dict) = doc.get_object_mut(page_id).and_then(|o| o.as_dict_mut()) {
            dict.set("Parent", Object::Reference(pages_id));
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn decode_text_simple_variants() {
        assert_eq!(decode_text_simple(b"{NAME}"), "{NAME}");
        assert_eq!(decode_text_simple(&[0x63, 0x61, 0x66, 0xE9]), "caf\u{00E9}");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x41, 0x00]), "A");
        assert_eq!(decode_text_simple(&[]), "");
    }

    #[test]
    fn get_number_accepts_integer_and_real() {
        assert_eq!(get_number_from_value(&PdfValue::Integer(-10)), Some(-10.0));
        assert_eq!(get_number_from_value(&PdfValue::Real(2.5)), Some(2.5));
        assert_eq!(get_number_from_value(&PdfValue::Name(b"F1".to_vec())), None);
    }

    #[test]
    fn convert_nested_objects() {
        let mut dict = lopdf::Dictionary::new();
        dict.set("Box", vec![Object::Integer(0), Object::Real(1.5)]);
        dict.set("Ref", Object::Reference((7, 0)));
        match convert_object(&Object::Dictionary(dict)) {
            PdfValue::Dict(entries) => {
                assert_eq!(
                    entries[0].1,
                    PdfValue::Array(vec![PdfValue::Integer(0), PdfValue::Real(1.5)])
                );
                assert_eq!(entries[1].1, PdfValue::Reference((7, 0)));
            }
            other => panic!("expected Dict, got {:?}", other),
        }
    }

    #[test]
    fn font_family_strips_subset_tag() {
        assert_eq!(
            font(Some("ABCDEF+Garamond"), None).family(),
            Some("Garamond")
        );
        assert_eq!(font(Some("Helvetica"), None).family(), Some("Helvetica"));
        assert_eq!(font(Some("Ab+Cd"), None).family(), Some("Ab+Cd"));
        assert_eq!(font(None, None).family(), None);
    }

    #[test]
    fn composite_font_detection() {
        assert!(font(None, Some("Type0")).is_composite());
        assert!(!font(None, Some("Type1")).is_composite());
    }

    #[test]
    fn glyph_width_lookup() {
        let widths = GlyphWidths {
            first_char: 65,
            widths: vec![600.0, 700.0],
        };
        assert_eq!(widths.width_of(b'A'), Some(600.0));
        assert_eq!(widths.width_of(b'B'), Some(700.0));
        assert_eq!(widths.width_of(b'C'), None);
        assert_eq!(widths.width_of(b' '), None);
    }

    #[test]
    fn page_box_dimensions() {
        let b = PageBox {
            llx: 10.0,
            lly: 20.0,
            urx: 110.0,
            ury: 820.0,
        };
        assert_eq!(b.width(), 100.0);
        assert_eq!(b.height(), 800.0);
    }

    #[test]
    fn lopdf_backend_reads_inherited_media_box_and_fonts() {
        let backend = LopdfBackend::load_bytes(&inherited_box_pdf()).unwrap();
        assert_eq!(backend.page_count(), 1);
        let page = backend.pages()[&1];

        let page_box = backend.page_box(page).unwrap();
        assert_eq!(page_box.height(), 595.0);
        assert_eq!(page_box.width(), 420.0);

        let fonts = backend.page_fonts(page).unwrap();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].key, b"F1");
        assert_eq!(fonts[0].family(), Some("Garamond-Bold"));
        assert_eq!(
            fonts[0].widths.as_ref().and_then(|w| w.width_of(b'B')),
            Some(700.0)
        );
    }

    #[test]
    fn crop_box_wins_over_media_box() {
        let bytes = boxed_pdf(
            dictionary! {
                "MediaBox" => rect([0, 0, 600, 900]),
                "CropBox" => rect([0, 0, 600, 800]),
            },
            dictionary! {},
        );
        let page_box = first_page_box(&bytes);
        assert_eq!(page_box.ury, 800.0);
        assert_eq!(page_box.height(), 800.0);
    }

    #[test]
    fn crop_box_is_inherited_and_clipped_to_media_box() {
        let bytes = boxed_pdf(
            dictionary! { "MediaBox" => rect([0, 0, 600, 900]) },
            dictionary! { "CropBox" => rect([50, -100, 700, 850]) },
        );
        assert_eq!(
            first_page_box(&bytes),
            PageBox {
                llx: 50.0,
                lly: 0.0,
                urx: 600.0,
                ury: 850.0,
            }
        );
    }

    #[test]
    fn crop_box_outside_media_box_is_ignored() {
        let bytes = boxed_pdf(
            dictionary! {
                "MediaBox" => rect([0, 0, 600, 900]),
                "CropBox" => rect([700, 0, 800, 100]),
            },
            dictionary! {},
        );
        assert_eq!(first_page_box(&bytes).ury, 900.0);
    }

    #[test]
    fn page_box_from_any_corner_order() {
        assert_eq!(
            PageBox::from_rect([600.0, 800.0, 0.0, 0.0]),
            PageBox::from_rect([0.0, 0.0, 600.0, 800.0])
        );
    }

    #[test]
    fn lopdf_backend_rejects_garbage() {
        assert!(matches!(
            LopdfBackend::load_bytes(b"not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }
}

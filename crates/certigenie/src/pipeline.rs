//! Detection orchestrator.
//!
//! Picks a strategy per upload and falls back in a fixed order:
//!
//! - PDF: embedded text, then OCR over page 1 when the text layer is
//!   unreadable or holds no tokens. Page 1 is always rasterized; without it
//!   there is no template to draw on, so a rasterization failure is fatal.
//! - Image: magenta marker regions, then OCR when there are none.
//!
//! Strategies run one after another, never in parallel.
//!
//! Text-layer fields keep PDF viewport coordinates at scale 1.0; the page is
//! rendered at [`Detection::render_scale`] pixels per point. OCR and color
//! fields are already in template pixels.

use std::path::Path;

use certigenie_core::color::detect_color_tokens;
use certigenie_core::field::{Field, FieldSource, RawField};
use certigenie_core::ids::IdSource;
use certigenie_core::kind::{classify, FileKind};
use certigenie_core::normalize::normalize_fields;
use certigenie_core::ocr::fields_from_recognition;
use indicatif::ProgressBar;
use pdf::tokens::fields_from_pages;
use serde::Serialize;

use crate::engine::{
    decode_upload, EngineConfig, LopdfTextLayer, Pdftoppm, RasterImage, Rasterizer, Recognizer,
    Tesseract, TextLayer,
};
use crate::error::Error;
use crate::prelude::set_spinner_msg;

/// Random v4 UUIDs, used for every field the shell hands out.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&mut self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// One uploaded file with whatever the client declared about it.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
    pub filename: Option<String>,
}

impl Upload {
    pub async fn from_path(path: &Path, mime: Option<String>) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            bytes,
            mime,
            filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        })
    }

    fn describe(&self) -> String {
        match (&self.mime, &self.filename) {
            (Some(mime), Some(name)) => format!("{name} ({mime})"),
            (Some(mime), None) => mime.clone(),
            (None, Some(name)) => name.clone(),
            (None, None) => format!("{} bytes of unknown content", self.bytes.len()),
        }
    }
}

/// Outcome of one detection run.
///
/// An empty field list is a valid result, not an error: the template simply
/// has no placeholders and the user can place fields by hand.
#[derive(Debug, Clone)]
pub struct Detection {
    pub kind: FileKind,
    /// Strategy whose fields were accepted.
    pub method: FieldSource,
    /// Normalized fields. `pdf-text` fields are in PDF viewport units at
    /// scale 1.0; every other method reports template pixels.
    pub fields: Vec<Field>,
    pub template: RasterImage,
    /// Template pixels per viewport unit for `pdf-text` fields, 1.0 otherwise.
    pub render_scale: f32,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn summary(&self) -> DetectionSummary<'_> {
        DetectionSummary {
            kind: self.kind,
            method: self.method,
            template_width: self.template.width,
            template_height: self.template.height,
            render_scale: self.render_scale,
            empty: self.is_empty(),
            fields: &self.fields,
        }
    }
}

/// JSON view of a [`Detection`], without the image bytes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary<'a> {
    pub kind: FileKind,
    pub method: FieldSource,
    pub template_width: u32,
    pub template_height: u32,
    pub render_scale: f32,
    pub empty: bool,
    pub fields: &'a [Field],
}

pub struct Pipeline {
    text_layer: Box<dyn TextLayer>,
    rasterizer: Box<dyn Rasterizer>,
    recognizer: Box<dyn Recognizer>,
    render_scale: f32,
}

impl Pipeline {
    pub fn new(
        text_layer: Box<dyn TextLayer>,
        rasterizer: Box<dyn Rasterizer>,
        recognizer: Box<dyn Recognizer>,
        render_scale: f32,
    ) -> Self {
        Self {
            text_layer,
            rasterizer,
            recognizer,
            render_scale,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Box::new(LopdfTextLayer),
            Box::new(Pdftoppm::new(config.pdftoppm.clone())),
            Box::new(Tesseract::new(config.tesseract.clone(), config.ocr_lang.clone())),
            config.render_scale,
        )
    }

    /// Classify the upload, run the detectors in fallback order and
    /// normalize the accepted fields.
    pub async fn detect<I>(
        &self,
        upload: &Upload,
        ids: I,
        spinner: Option<&ProgressBar>,
    ) -> Result<Detection, Error>
    where
        I: IdSource + Send + 'static,
    {
        let kind = classify(
            upload.mime.as_deref(),
            upload.filename.as_deref(),
            &upload.bytes,
        )
        .ok_or_else(|| Error::UnsupportedFileKind(upload.describe()))?;
        log::info!("Processing {} as {kind}", upload.describe());

        let (method, raw, template) = match kind {
            FileKind::Pdf => self.detect_pdf(&upload.bytes, ids, spinner).await?,
            FileKind::Image(_) => self.detect_image(upload.bytes.clone(), ids, spinner).await?,
        };

        let fields = normalize_fields(&raw);
        let render_scale = match method {
            FieldSource::PdfText => self.render_scale,
            _ => 1.0,
        };
        log::info!(
            "Accepted {} field(s) from {method} on a {}x{} template",
            fields.len(),
            template.width,
            template.height
        );

        Ok(Detection {
            kind,
            method,
            fields,
            template,
            render_scale,
        })
    }

    async fn detect_pdf<I>(
        &self,
        bytes: &[u8],
        mut ids: I,
        spinner: Option<&ProgressBar>,
    ) -> Result<(FieldSource, Vec<RawField>, RasterImage), Error>
    where
        I: IdSource + Send,
    {
        set_spinner_msg(spinner, "Extracting text from PDF...");
        let embedded = match self.text_layer.open(bytes).await {
            Ok(pages) => fields_from_pages(&pages, &mut ids),
            Err(e) => {
                log::warn!("Text layer unreadable, falling back to OCR: {e}");
                set_spinner_msg(spinner, "Text extraction failed, trying OCR...");
                Vec::new()
            }
        };
        log::debug!("Text layer produced {} field(s)", embedded.len());

        set_spinner_msg(spinner, "Rendering page 1...");
        let template = self
            .rasterizer
            .render_first_page(bytes, self.render_scale)
            .await?;

        if !embedded.is_empty() {
            return Ok((FieldSource::PdfText, embedded, template));
        }

        log::info!("No tokens in the text layer, running OCR on page 1");
        set_spinner_msg(spinner, "Recognizing text on page 1...");
        let fields = self.recognize(&template.png, ids).await;
        Ok((FieldSource::Ocr, fields, template))
    }

    async fn detect_image<I>(
        &self,
        bytes: Vec<u8>,
        ids: I,
        spinner: Option<&ProgressBar>,
    ) -> Result<(FieldSource, Vec<RawField>, RasterImage), Error>
    where
        I: IdSource + Send + 'static,
    {
        set_spinner_msg(spinner, "Decoding image...");
        let (decoded, template) = decode_upload(bytes).await?;

        set_spinner_msg(spinner, "Scanning for marker regions...");
        let (marked, ids) = tokio::task::spawn_blocking(move || -> Result<_, Error> {
            let mut ids = ids;
            let fields = detect_color_tokens(&decoded.pixels()?, &mut ids);
            Ok((fields, ids))
        })
        .await
        .map_err(|e| Error::ImageDecodeFailure(format!("Task join error: {e}")))??;

        if !marked.is_empty() {
            log::debug!("Found {} marker region(s)", marked.len());
            return Ok((FieldSource::Color, marked, template));
        }

        log::info!("No marker regions, running OCR on the image");
        set_spinner_msg(spinner, "No color markers found, trying OCR...");
        let fields = self.recognize(&template.png, ids).await;
        Ok((FieldSource::Ocr, fields, template))
    }

    /// OCR never fails the pipeline: engine errors count as "no tokens".
    async fn recognize(&self, png: &[u8], ids: impl IdSource) -> Vec<RawField> {
        match self.recognizer.recognize(png).await {
            Ok(recognition) => fields_from_recognition(&recognition, ids),
            Err(e) => {
                log::warn!("Recognition failed, continuing without OCR tokens: {e}");
                Vec::new()
            }
        }
    }
}

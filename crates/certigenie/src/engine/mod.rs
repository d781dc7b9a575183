//! External engines the detection pipeline talks to.
//!
//! Each engine sits behind a small async trait so the pipeline can be driven
//! by stubs in tests. The real implementations shell out to Poppler and
//! Tesseract, or parse the PDF in-process with `lopdf`.

mod decode;
mod pdftoppm;
mod tesseract;
mod text_layer;

use std::path::PathBuf;

use async_trait::async_trait;
use certigenie_core::ocr::Recognition;
use pdf::PageRuns;

use crate::error::Error;

pub use decode::{decode_upload, raster_from_png};
pub use pdftoppm::Pdftoppm;
pub use tesseract::Tesseract;
pub use text_layer::LopdfTextLayer;

#[cfg(test)]
pub(crate) use decode::tests::png_with_rects;

/// A rendered template page, PNG encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Reads the embedded text layer of a PDF.
#[async_trait]
pub trait TextLayer: Send + Sync {
    /// Parse the document and return the text runs of every page.
    async fn open(&self, bytes: &[u8]) -> Result<Vec<PageRuns>, Error>;
}

/// Renders a PDF page to pixels.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Page 1 at `scale` pixels per PDF point.
    async fn render_first_page(&self, bytes: &[u8], scale: f32) -> Result<RasterImage, Error>;
}

/// Optical character recognition over a PNG.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, png: &[u8]) -> Result<Recognition, Error>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_RENDER_SCALE: f32 = 1.5;
pub const DEFAULT_OCR_LANG: &str = "eng";

/// Where the external engines live and how to drive them.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub tesseract: Option<PathBuf>,
    pub pdftoppm: Option<PathBuf>,
    pub ocr_lang: String,
    pub render_scale: f32,
}

impl EngineConfig {
    /// Locate the engine binaries once. Explicit paths win over `PATH`.
    ///
    /// A binary that cannot be found is left as `None`; the engine then
    /// reports [`Error::EngineUnavailable`] when it is first used.
    pub fn resolve(global: &crate::Global) -> Self {
        let config = Self {
            tesseract: locate(global.tesseract.as_ref(), "tesseract"),
            pdftoppm: locate(global.pdftoppm.as_ref(), "pdftoppm"),
            ocr_lang: global.ocr_lang.clone(),
            render_scale: sanitize_scale(global.render_scale),
        };

        log::debug!("Engine configuration: {config:?}");
        config
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tesseract: None,
            pdftoppm: None,
            ocr_lang: DEFAULT_OCR_LANG.to_string(),
            render_scale: DEFAULT_RENDER_SCALE,
        }
    }
}

fn locate(explicit: Option<&PathBuf>, name: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.clone());
    }
    match which::which(name) {
        Ok(path) => Some(path),
        Err(e) => {
            log::warn!("{name} not found on PATH: {e}");
            None
        }
    }
}

fn sanitize_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        log::warn!("Ignoring render scale {scale}, using {DEFAULT_RENDER_SCALE}");
        DEFAULT_RENDER_SCALE
    }
}

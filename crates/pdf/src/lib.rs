use thiserror::Error;

use parser::backend::LopdfBackend;

pub mod parser;
pub mod tokens;

pub use parser::runs::TextRun;
pub use tokens::PageRuns;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Document has no pages")]
    NoPages,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A parsed template document.
///
/// Constructed via [`TemplateDocument::from_bytes`]. Parsing happens once;
/// token fields come from [`tokens::fields_from_pages`] over
/// [`TemplateDocument::all_runs`].
pub struct TemplateDocument {
    backend: LopdfBackend,
}

impl TemplateDocument {
    /// Parse PDF bytes. Fails on corrupt, encrypted, or page-less documents.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let backend = LopdfBackend::load_bytes(bytes)?;
        if backend.page_count() == 0 {
            return Err(PdfError::NoPages);
        }
        Ok(Self { backend })
    }

    pub fn page_count(&self) -> usize {
        self.backend.page_count()
    }

    /// Text runs and visible page box of every page.
    pub fn all_runs(&self) -> Result<Vec<PageRuns>, PdfError> {
        tokens::extract_all_pages(&self.backend)
    }
}

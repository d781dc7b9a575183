use async_trait::async_trait;
use pdf::{PageRuns, TemplateDocument};

use super::TextLayer;
use crate::error::Error;

/// In-process text layer backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfTextLayer;

#[async_trait]
impl TextLayer for LopdfTextLayer {
    async fn open(&self, bytes: &[u8]) -> Result<Vec<PageRuns>, Error> {
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || -> Result<Vec<PageRuns>, Error> {
            let document = TemplateDocument::from_bytes(&bytes)?;
            log::debug!("Parsed PDF with {} page(s)", document.page_count());
            Ok(document.all_runs()?)
        })
        .await
        .map_err(|e| Error::DocumentParseFailure(format!("Task join error: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_corrupt_pdf_is_parse_failure() {
        let err = LopdfTextLayer.open(b"%PDF-1.5\nthis is not a pdf").await.unwrap_err();
        assert!(matches!(err, Error::DocumentParseFailure(_)));
    }

    #[tokio::test]
    async fn test_empty_input_is_parse_failure() {
        let err = LopdfTextLayer.open(&[]).await.unwrap_err();
        assert_eq!(err.kind(), "DocumentParseFailure");
    }
}

use std::path::PathBuf;

use async_trait::async_trait;
use certigenie_core::ocr::{parse_tesseract_tsv, Recognition};
use tokio::process::Command;

use super::Recognizer;
use crate::error::Error;

/// Recognizer that runs the `tesseract` CLI in TSV mode.
#[derive(Debug, Clone)]
pub struct Tesseract {
    binary: Option<PathBuf>,
    lang: String,
}

impl Tesseract {
    pub fn new(binary: Option<PathBuf>, lang: impl Into<String>) -> Self {
        Self {
            binary,
            lang: lang.into(),
        }
    }
}

fn failure(context: &str, e: impl std::fmt::Display) -> Error {
    Error::RecognitionFailure(format!("{context}: {e}"))
}

#[async_trait]
impl Recognizer for Tesseract {
    async fn recognize(&self, png: &[u8]) -> Result<Recognition, Error> {
        let binary = self
            .binary
            .as_ref()
            .ok_or_else(|| Error::EngineUnavailable("tesseract".to_string()))?;

        let image = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(|e| failure("Failed to create temp file", e))?;
        tokio::fs::write(image.path(), png)
            .await
            .map_err(|e| failure("Failed to write temp image", e))?;

        log::debug!("Running {} ({})", binary.display(), self.lang);

        let output = Command::new(binary)
            .arg(image.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .arg("tsv")
            .output()
            .await
            .map_err(|e| failure("Failed to run tesseract", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::RecognitionFailure(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let recognition = parse_tesseract_tsv(&String::from_utf8_lossy(&output.stdout));
        log::debug!("tesseract recognized {} word(s)", recognition.words.len());
        Ok(recognition)
    }
}

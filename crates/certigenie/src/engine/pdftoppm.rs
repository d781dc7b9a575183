use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use super::{raster_from_png, RasterImage, Rasterizer};
use crate::error::Error;

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterizer that runs Poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    binary: Option<PathBuf>,
}

impl Pdftoppm {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }
}

/// Resolution that makes one PDF point `scale` pixels wide.
fn dpi_for_scale(scale: f32) -> u32 {
    (POINTS_PER_INCH * scale).round().max(1.0) as u32
}

/// Page 1 only, clipped to the CropBox so the image matches the text-layer
/// viewport.
fn render_args(dpi: u32, input: &Path, prefix: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-png", "-cropbox", "-r"].map(OsString::from).to_vec();
    args.push(dpi.to_string().into());
    args.extend(["-f", "1", "-l", "1", "-singlefile"].map(OsString::from));
    args.push(input.into());
    args.push(prefix.into());
    args
}

fn failure(context: &str, e: impl std::fmt::Display) -> Error {
    Error::RasterizationFailure(format!("{context}: {e}"))
}

#[async_trait]
impl Rasterizer for Pdftoppm {
    async fn render_first_page(&self, bytes: &[u8], scale: f32) -> Result<RasterImage, Error> {
        let binary = self
            .binary
            .as_ref()
            .ok_or_else(|| Error::EngineUnavailable("pdftoppm".to_string()))?;

        let dir = tempfile::tempdir().map_err(|e| failure("Failed to create temp dir", e))?;
        let input = dir.path().join("template.pdf");
        let prefix = dir.path().join("page");
        tokio::fs::write(&input, bytes)
            .await
            .map_err(|e| failure("Failed to write temp PDF", e))?;

        let dpi = dpi_for_scale(scale);
        log::debug!("Rendering page 1 at {dpi} dpi with {}", binary.display());

        let output = Command::new(binary)
            .args(render_args(dpi, &input, &prefix))
            .output()
            .await
            .map_err(|e| failure("Failed to run pdftoppm", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::RasterizationFailure(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let png = tokio::fs::read(prefix.with_extension("png"))
            .await
            .map_err(|e| failure("pdftoppm produced no image", e))?;

        raster_from_png(png).await
    }
}

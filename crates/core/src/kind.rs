//! Upload classification: PDF, raster image, or unsupported.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    WebP,
    Tiff,
    Unknown,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Png => write!(f, "png"),
            ImageFormat::Jpeg => write!(f, "jpeg"),
            ImageFormat::Gif => write!(f, "gif"),
            ImageFormat::Bmp => write!(f, "bmp"),
            ImageFormat::WebP => write!(f, "webp"),
            ImageFormat::Tiff => write!(f, "tiff"),
            ImageFormat::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "format", rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Image(ImageFormat),
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Pdf => write!(f, "pdf"),
            FileKind::Image(format) => write!(f, "image/{}", format),
        }
    }
}

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn format_from_extension(ext: &str) -> ImageFormat {
    match ext {
        "png" => ImageFormat::Png,
        "jpg" | "jpeg" => ImageFormat::Jpeg,
        "gif" => ImageFormat::Gif,
        "bmp" => ImageFormat::Bmp,
        "webp" => ImageFormat::WebP,
        "tif" | "tiff" => ImageFormat::Tiff,
        _ => ImageFormat::Unknown,
    }
}

/// Detect a raster format from its leading magic bytes.
pub fn sniff_image_format(bytes: &[u8]) -> ImageFormat {
    if bytes.len() < 8 {
        return ImageFormat::Unknown;
    }

    // JPEG: FF D8 FF
    if bytes[..3] == [0xFF, 0xD8, 0xFF] {
        return ImageFormat::Jpeg;
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if bytes[..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return ImageFormat::Png;
    }

    if &bytes[..6] == b"GIF87a" || &bytes[..6] == b"GIF89a" {
        return ImageFormat::Gif;
    }

    // TIFF: II*\0 or MM\0*
    if bytes[..4] == [0x49, 0x49, 0x2A, 0x00] || bytes[..4] == [0x4D, 0x4D, 0x00, 0x2A] {
        return ImageFormat::Tiff;
    }

    if &bytes[..2] == b"BM" {
        return ImageFormat::Bmp;
    }

    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return ImageFormat::WebP;
    }

    ImageFormat::Unknown
}

/// `true` when the payload starts with a PDF header.
pub fn sniff_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// Decide how an upload should be processed.
///
/// The declared MIME type and the filename extension are consulted first,
/// PDF before image. Magic bytes decide only when neither is conclusive.
/// `None` means the file is unsupported.
pub fn classify(mime: Option<&str>, filename: Option<&str>, bytes: &[u8]) -> Option<FileKind> {
    let mime = mime.map(|m| m.trim().to_ascii_lowercase());
    let ext = filename.and_then(extension);

    let image = |fallback: ImageFormat| {
        let sniffed = sniff_image_format(bytes);
        if sniffed == ImageFormat::Unknown {
            FileKind::Image(fallback)
        } else {
            FileKind::Image(sniffed)
        }
    };

    if mime.as_deref() == Some("application/pdf") || ext.as_deref() == Some("pdf") {
        return Some(FileKind::Pdf);
    }

    if let Some(subtype) = mime.as_deref().and_then(|m| m.strip_prefix("image/")) {
        let declared = match subtype {
            "jpg" => ImageFormat::Jpeg,
            other => format_from_extension(other),
        };
        return Some(image(declared));
    }

    if let Some(ext) = ext.as_deref().filter(|e| IMAGE_EXTENSIONS.contains(e)) {
        return Some(image(format_from_extension(ext)));
    }

    if sniff_pdf(bytes) {
        return Some(FileKind::Pdf);
    }

    match sniff_image_format(bytes) {
        ImageFormat::Unknown => None,
        format => Some(FileKind::Image(format)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_pdf_by_mime() {
        assert_eq!(
            classify(Some("application/pdf"), None, b""),
            Some(FileKind::Pdf)
        );
    }

    #[test]
    fn test_pdf_by_extension_case_insensitive() {
        assert_eq!(
            classify(None, Some("Template.PDF"), b""),
            Some(FileKind::Pdf)
        );
    }

    #[test]
    fn test_image_by_mime_uses_sniffed_format() {
        assert_eq!(
            classify(Some("image/jpeg"), Some("scan.bin"), &PNG_MAGIC),
            Some(FileKind::Image(ImageFormat::Png))
        );
    }

    #[test]
    fn test_image_by_mime_without_magic() {
        assert_eq!(
            classify(Some("image/svg+xml"), None, b"<svg/>"),
            Some(FileKind::Image(ImageFormat::Unknown))
        );
    }

    #[test]
    fn test_image_by_extension() {
        assert_eq!(
            classify(None, Some("cert.webp"), b""),
            Some(FileKind::Image(ImageFormat::WebP))
        );
        assert_eq!(
            classify(Some("application/octet-stream"), Some("cert.JPG"), b""),
            Some(FileKind::Image(ImageFormat::Jpeg))
        );
    }

    #[test]
    fn test_pdf_wins_over_image() {
        assert_eq!(
            classify(Some("image/png"), Some("template.pdf"), &PNG_MAGIC),
            Some(FileKind::Pdf)
        );
    }

    #[test]
    fn test_sniff_when_undeclared() {
        assert_eq!(
            classify(None, Some("upload"), b"%PDF-1.7\n..."),
            Some(FileKind::Pdf)
        );
        assert_eq!(
            classify(None, None, &PNG_MAGIC),
            Some(FileKind::Image(ImageFormat::Png))
        );
    }

    #[test]
    fn test_unsupported() {
        assert_eq!(classify(Some("text/plain"), Some("notes.txt"), b"hello world"), None);
        assert_eq!(classify(None, None, b""), None);
    }

    #[test]
    fn test_sniff_image_formats() {
        assert_eq!(
            sniff_image_format(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0]),
            ImageFormat::Jpeg
        );
        assert_eq!(sniff_image_format(b"GIF89a\0\0"), ImageFormat::Gif);
        assert_eq!(sniff_image_format(b"BM\0\0\0\0\0\0"), ImageFormat::Bmp);
        assert_eq!(sniff_image_format(b"RIFF\0\0\0\0WEBP"), ImageFormat::WebP);
        assert_eq!(sniff_image_format(b"short"), ImageFormat::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(FileKind::Pdf.to_string(), "pdf");
        assert_eq!(FileKind::Image(ImageFormat::Png).to_string(), "image/png");
    }
}

/// Classified detection failures.
///
/// `DocumentParseFailure` and `RecognitionFailure` are recovered inside the
/// pipeline; the rest reach the caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Unsupported file kind: {0}")]
    UnsupportedFileKind(String),

    #[error("Could not read the document text layer: {0}")]
    DocumentParseFailure(String),

    #[error("Could not rasterize the document: {0}")]
    RasterizationFailure(String),

    #[error("Recognition engine failed: {0}")]
    RecognitionFailure(String),

    #[error("Could not decode image: {0}")]
    ImageDecodeFailure(String),

    #[error("Engine '{0}' is not available")]
    EngineUnavailable(String),
}

impl Error {
    /// Stable machine-readable name, used in MCP error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnsupportedFileKind(_) => "UnsupportedFileKind",
            Error::DocumentParseFailure(_) => "DocumentParseFailure",
            Error::RasterizationFailure(_) => "RasterizationFailure",
            Error::RecognitionFailure(_) => "RecognitionFailure",
            Error::ImageDecodeFailure(_) => "ImageDecodeFailure",
            Error::EngineUnavailable(_) => "EngineUnavailable",
        }
    }
}

impl From<pdf::PdfError> for Error {
    fn from(e: pdf::PdfError) -> Self {
        Error::DocumentParseFailure(e.to_string())
    }
}

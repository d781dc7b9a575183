//! Core library for certigenie
//!
//! This crate implements the **Functional Core** of the certigenie
//! application, following the Functional Core - Imperative Shell architectural
//! pattern.
//!
//! # Architecture Overview
//!
//! The project is split so that detection logic never touches the outside
//! world:
//!
//! - **`certigenie_core`** (this crate): pure transformations with zero I/O
//! - **`pdf`**: the embedded-text extractor behind a document backend trait
//! - **`certigenie`**: engines, orchestration, CLI and MCP server (the
//!   Imperative Shell)
//!
//! Every function here takes its inputs as values (pixel buffers, recognized
//! words, raw fields) and returns new values. Identifiers and randomness are
//! injected by the caller, so the same input always produces the same output.
//!
//! # Module Organization
//!
//! - [`field`]: the placeholder field schema (`RawField`, `Field`)
//! - [`token`]: the `{UPPERCASE_UNDERSCORE}` token grammar
//! - [`region`]: 8-connected flood fill over RGBA buffers
//! - [`color`]: magenta marker detection on raster templates
//! - [`ocr`]: recognized words to fields, Tesseract TSV parsing
//! - [`normalize`]: style defaults for every field
//! - [`kind`]: PDF / image classification of uploads
//! - [`cert`]: certificate identifiers and verification URLs
//! - [`template`]: template and issued-certificate records
//! - [`ids`]: injected field identifier sources
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use certigenie_core::color::detect_color_tokens;
//! use certigenie_core::ids::SequentialIds;
//! use certigenie_core::normalize::normalize_fields;
//! use certigenie_core::region::PixelBuffer;
//!
//! let buffer = PixelBuffer::new(width, height, &rgba)?;
//! let raw = detect_color_tokens(&buffer, SequentialIds::default());
//! let fields = normalize_fields(&raw);
//! assert!(fields.iter().all(|f| f.font_family == "Arial"));
//! ```

pub mod cert;
pub mod color;
pub mod field;
pub mod ids;
pub mod kind;
pub mod normalize;
pub mod ocr;
pub mod region;
pub mod template;
pub mod token;

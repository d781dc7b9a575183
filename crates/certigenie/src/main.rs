#![allow(unused)]

use std::path::PathBuf;

use crate::prelude::*;
use clap::Parser;

mod cert;
mod detect;
mod engine;
mod error;
mod mcp;
mod normalize;
mod pipeline;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Find placeholder tokens such as {NAME} on certificate templates and lay out their fields"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Tesseract binary (defaults to the one on PATH)
    #[clap(long, env = "CERTIGENIE_TESSERACT", global = true)]
    tesseract: Option<PathBuf>,

    /// Poppler pdftoppm binary (defaults to the one on PATH)
    #[clap(long, env = "CERTIGENIE_PDFTOPPM", global = true)]
    pdftoppm: Option<PathBuf>,

    /// OCR language(s), in Tesseract notation
    #[clap(long, env = "CERTIGENIE_OCR_LANG", global = true, default_value = "eng")]
    ocr_lang: String,

    /// Pixels per PDF point when rasterizing PDF templates
    #[clap(
        long,
        env = "CERTIGENIE_RENDER_SCALE",
        global = true,
        default_value = "1.5"
    )]
    render_scale: f32,

    /// Host used in certificate verification URLs
    #[clap(
        long,
        env = "CERTIGENIE_VERIFY_HOST",
        global = true,
        default_value = "certigenie.app"
    )]
    verify_host: String,

    /// Whether to display additional information.
    #[clap(long, env = "CERTIGENIE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Detect placeholder tokens on a PDF or image template
    Detect(crate::detect::DetectOptions),

    /// Fill style defaults into a JSON field list
    Normalize(crate::normalize::NormalizeOptions),

    /// Certificate identifiers and verification URLs
    Cert(crate::cert::App),

    /// Model Context Protocol server
    MCP(crate::mcp::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Detect(options) => crate::detect::run(options, app.global).await,
        SubCommands::Normalize(options) => crate::normalize::run(options, app.global).await,
        SubCommands::Cert(sub_app) => crate::cert::run(sub_app, app.global).await,
        SubCommands::MCP(sub_app) => crate::mcp::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}

#[cfg(test)]
pub(crate) fn test_global() -> Global {
    Global {
        tesseract: None,
        pdftoppm: None,
        ocr_lang: "eng".to_string(),
        render_scale: 1.5,
        verify_host: "certigenie.app".to_string(),
        verbose: false,
    }
}

use std::path::{Path, PathBuf};

use certigenie_core::field::{Field, RawField};
use certigenie_core::ids::IdSource;
use certigenie_core::template::Template;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::engine::EngineConfig;
use crate::pipeline::{Detection, Pipeline, Upload, UuidIds};
use crate::prelude::{eprintln, println, *};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, clap::Args)]
pub struct DetectOptions {
    /// Template file (PDF or raster image)
    pub path: PathBuf,

    /// Declared MIME type; guessed from the extension and content otherwise
    #[arg(long)]
    pub mime: Option<String>,

    /// Write the template image (PNG) to this path
    #[arg(long)]
    pub template_out: Option<PathBuf>,

    /// Save a template record (JSON) holding the detected fields
    #[arg(long)]
    pub save_template: Option<PathBuf>,

    /// Name of the saved template (defaults to "Template YYYY-MM-DD")
    #[arg(long, requires = "save_template")]
    pub name: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

pub async fn run(options: DetectOptions, global: crate::Global) -> Result<()> {
    let config = EngineConfig::resolve(&global);
    let pipeline = Pipeline::from_config(&config);

    if global.verbose {
        eprintln!("Detecting tokens in {}", options.path.display());
        eprintln!("Render scale: {}", config.render_scale);
        eprintln!();
    }

    let upload = Upload::from_path(&options.path, options.mime.clone())
        .await
        .wrap_err_with(|| f!("Failed to read {}", options.path.display()))?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let detection = pipeline.detect(&upload, UuidIds, Some(&spinner)).await;

    // Clear the spinner before printing output
    spinner.finish_and_clear();
    let detection = detection?;

    if let Some(out) = &options.template_out {
        tokio::fs::write(out, &detection.template.png)
            .await
            .wrap_err_with(|| f!("Failed to write {}", out.display()))?;
    }

    if let Some(out) = &options.save_template {
        let image_ref = options
            .template_out
            .as_deref()
            .unwrap_or(&options.path)
            .display()
            .to_string();
        let template = template_record(&detection, options.name.as_deref(), image_ref);
        tokio::fs::write(out, serde_json::to_string_pretty(&template)?)
            .await
            .wrap_err_with(|| f!("Failed to write {}", out.display()))?;
        if global.verbose {
            eprintln!("Saved template {} to {}", template.id, out.display());
        }
    }

    match options.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&detection.summary())?),
        OutputFormat::Table => print_table(&detection),
    }

    if detection.is_empty() {
        eprintln!(
            "{}",
            "No placeholder tokens found; fields can be added manually.".yellow()
        );
    }

    Ok(())
}

fn template_record(detection: &Detection, name: Option<&str>, image_ref: String) -> Template {
    let raw: Vec<RawField> = detection.fields.iter().cloned().map(RawField::from).collect();
    let mut template = Template::new(
        UuidIds.next_id(),
        name,
        &raw,
        image_ref,
        chrono::Utc::now(),
    );
    template.render_scale = detection.render_scale;
    template
}

fn print_table(detection: &Detection) {
    println!(
        "\n{} {} via {} ({}x{} px)\n",
        "Template:".bold().cyan(),
        detection.kind,
        detection.method.to_string().bright_yellow(),
        detection.template.width,
        detection.template.height
    );
    if detection.render_scale != 1.0 {
        println!(
            "Field coordinates are PDF points; multiply by {} for template pixels.\n",
            detection.render_scale
        );
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Name".bold().cyan(),
        "Type".bold().cyan(),
        "X".bold().cyan(),
        "Y".bold().cyan(),
        "Width".bold().cyan(),
        "Height".bold().cyan(),
        "Font".bold().cyan(),
        "Color".bold().cyan()
    ]);
    for field in &detection.fields {
        table.add_row(field_row(field));
    }
    table.printstd();
}

fn field_row(field: &Field) -> prettytable::Row {
    let kind = serde_json::to_value(field.kind)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default();
    prettytable::row![
        field.name.bright_white(),
        kind,
        f!("{:.1}", field.x),
        f!("{:.1}", field.y),
        f!("{:.1}", field.width),
        f!("{:.1}", field.height),
        f!("{} {:.1} {}", field.font_family, field.font_size, field.font_weight),
        field.text_color
    ]
}

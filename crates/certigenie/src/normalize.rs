use certigenie_core::field::{Bounds, RawField};
use certigenie_core::ids::IdSource;
use certigenie_core::normalize::normalize_fields;
use serde::Deserialize;
use tokio::io::AsyncReadExt;

use crate::pipeline::UuidIds;
use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args)]
pub struct NormalizeOptions {
    /// JSON file holding a field list (or an object with a `fields` key); `-` reads stdin
    #[arg(default_value = "-")]
    pub input: String,

    /// Append a manual field, as NAME=X,Y,WIDTH,HEIGHT (repeatable)
    #[arg(long = "add", value_name = "FIELD")]
    pub add: Vec<String>,
}

/// Accepts a bare list or anything that wraps one, such as detection output
/// or a saved template.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldInput {
    List(Vec<RawField>),
    Wrapped { fields: Vec<RawField> },
}

impl FieldInput {
    fn into_fields(self) -> Vec<RawField> {
        match self {
            FieldInput::List(fields) | FieldInput::Wrapped { fields } => fields,
        }
    }
}

pub async fn run(options: NormalizeOptions, global: crate::Global) -> Result<()> {
    let json = if options.input == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .wrap_err("Failed to read stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(&options.input)
            .await
            .wrap_err_with(|| f!("Failed to read {}", options.input))?
    };

    let mut fields = parse_fields(&json)?;

    let mut ids = UuidIds;
    for spec in &options.add {
        fields.push(parse_manual_field(spec, &mut ids)?);
    }

    if global.verbose {
        eprintln!("Normalizing {} field(s)", fields.len());
    }

    println!("{}", serde_json::to_string_pretty(&normalize_fields(&fields))?);

    Ok(())
}

fn parse_fields(json: &str) -> Result<Vec<RawField>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let input: FieldInput = serde_json::from_str(json).wrap_err("Input is not a field list")?;
    Ok(input.into_fields())
}

/// `NAME=X,Y,WIDTH,HEIGHT` to a `manual` field.
fn parse_manual_field(spec: &str, ids: &mut impl IdSource) -> Result<RawField> {
    let (name, geometry) = spec
        .split_once('=')
        .ok_or_else(|| eyre!("Expected NAME=X,Y,WIDTH,HEIGHT, got '{spec}'"))?;

    let numbers = geometry
        .split(',')
        .map(|n| n.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .wrap_err_with(|| f!("Invalid geometry in '{spec}'"))?;
    let [x, y, width, height] = numbers[..] else {
        return Err(eyre!("Expected four numbers in '{spec}'"));
    };

    let bounds = Bounds::new(x, y, width, height);
    if bounds.is_degenerate() {
        return Err(eyre!("Field '{name}' has no area"));
    }

    Ok(RawField::manual(ids.next_id(), name.trim(), bounds)?)
}

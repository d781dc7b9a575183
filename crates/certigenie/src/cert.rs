use std::collections::BTreeMap;
use std::path::PathBuf;

use certigenie_core::cert::{cert_id_from_url, generate_certificate_id, verify_url, DEFAULT_PREFIX};
use certigenie_core::template::{resolve_field_values, CertificateRecord, Template};
use chrono::Datelike;
use serde::Serialize;

use crate::prelude::{println, *};

#[derive(Debug, clap::Parser)]
#[command(name = "cert")]
#[command(about = "Certificate identifiers and verification URLs")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Generate a PREFIX-YEAR-NNN certificate identifier
    Id {
        /// Identifier prefix
        #[arg(long, default_value = DEFAULT_PREFIX)]
        prefix: String,
        /// Issue year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Print the verification URL for an identifier
    Url {
        /// Certificate identifier
        cert_id: String,
    },

    /// Extract the identifier from a verification URL
    Verify {
        /// Verification URL (e.g. scanned from a QR code)
        url: String,
    },

    /// Issue a certificate from a saved template and print what each field draws
    Issue {
        /// Template JSON written by `detect --save-template`
        template: PathBuf,
        /// Field value, as NAME=VALUE (repeatable)
        #[arg(long = "value", value_name = "NAME=VALUE", value_parser = parse_key_value)]
        values: Vec<(String, String)>,
        /// Identifier prefix
        #[arg(long, default_value = DEFAULT_PREFIX)]
        prefix: String,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IssuedCertificate {
    record: CertificateRecord,
    fields: Vec<certigenie_core::template::FieldValue>,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    match app.command {
        Commands::Id { prefix, year } => {
            let year = year.unwrap_or_else(|| chrono::Utc::now().year());
            let id = generate_certificate_id(&prefix, year, &mut rand::thread_rng())?;
            println!("{id}");
            Ok(())
        }
        Commands::Url { cert_id } => {
            println!("{}", verify_url(&global.verify_host, &cert_id)?);
            Ok(())
        }
        Commands::Verify { url } => {
            let id = cert_id_from_url(&url, &global.verify_host).ok_or_else(|| {
                eyre!(
                    "Not a verification URL for {}: {}",
                    global.verify_host,
                    url
                )
            })?;
            println!("{id}");
            Ok(())
        }
        Commands::Issue {
            template,
            values,
            prefix,
        } => {
            let json = tokio::fs::read_to_string(&template)
                .await
                .wrap_err_with(|| f!("Failed to read {}", template.display()))?;
            let template: Template =
                serde_json::from_str(&json).wrap_err("Invalid template file")?;
            let issued = issue(&template, values, &prefix, &global.verify_host)?;
            println!("{}", serde_json::to_string_pretty(&issued)?);
            Ok(())
        }
    }
}

fn issue(
    template: &Template,
    values: Vec<(String, String)>,
    prefix: &str,
    host: &str,
) -> Result<IssuedCertificate> {
    let now = chrono::Utc::now();
    let cert_id = generate_certificate_id(prefix, now.year(), &mut rand::thread_rng())?;
    let values: BTreeMap<String, String> = values.into_iter().collect();
    let record = CertificateRecord::issue(template, values, cert_id, host, now)?;
    let fields = resolve_field_values(&template.fields, &record);
    Ok(IssuedCertificate { record, fields })
}

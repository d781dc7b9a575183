//! Template and issued-certificate records handed to the editor and renderer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cert::{verify_url, CertIdError};
use crate::field::{Field, RawField, CERT_ID, QR_CODE};
use crate::normalize::normalize_fields;

/// A saved template: the raster image reference plus its normalized fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub fields: Vec<Field>,
    pub image_ref: String,
    /// Image pixels per field unit; above 1.0 when the fields came from a
    /// PDF text layer and the image is a scaled rendering.
    #[serde(default = "unit_scale")]
    pub render_scale: f32,
    pub created_at: String,
    pub last_modified: String,
}

fn unit_scale() -> f32 {
    1.0
}

impl Template {
    /// Build a template, normalizing `fields`.
    ///
    /// A missing or blank name becomes `Template YYYY-MM-DD`.
    pub fn new(
        id: String,
        name: Option<&str>,
        fields: &[RawField],
        image_ref: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("Template {}", created_at.format("%Y-%m-%d")));
        let stamp = created_at.to_rfc3339();
        Self {
            id,
            name,
            fields: normalize_fields(fields),
            image_ref: image_ref.into(),
            render_scale: unit_scale(),
            created_at: stamp.clone(),
            last_modified: stamp,
        }
    }
}

/// One generated certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    pub cert_id: String,
    pub template_id: String,
    pub template_name: String,
    pub values: BTreeMap<String, String>,
    pub verify_url: String,
    pub issued_at: String,
}

impl CertificateRecord {
    pub fn issue(
        template: &Template,
        values: BTreeMap<String, String>,
        cert_id: String,
        host: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, CertIdError> {
        let verify_url = verify_url(host, &cert_id)?;
        Ok(Self {
            cert_id,
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            values,
            verify_url,
            issued_at: issued_at.to_rfc3339(),
        })
    }
}

/// What a renderer should draw into one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    pub field_id: String,
    pub name: String,
    pub value: String,
}

/// Resolve the text (or QR payload) for every field, in field order.
///
/// `CERT_ID` draws the identifier, `QR_CODE` encodes the verification URL,
/// everything else comes from the record values (missing means empty).
pub fn resolve_field_values(fields: &[Field], record: &CertificateRecord) -> Vec<FieldValue> {
    fields
        .iter()
        .map(|field| {
            let value = match field.name.as_str() {
                CERT_ID => record.cert_id.clone(),
                QR_CODE => record.verify_url.clone(),
                name => record.values.get(name).cloned().unwrap_or_default(),
            };
            FieldValue {
                field_id: field.id.clone(),
                name: field.name.clone(),
                value,
            }
        })
        .collect()
}

use base64::Engine;
use certigenie_core::cert::{generate_certificate_id, verify_url, DEFAULT_PREFIX};
use certigenie_core::field::RawField;
use certigenie_core::normalize::normalize_fields;
use chrono::Datelike;
use serde::Deserialize;

use super::{CallToolResult, Content, JsonRpcError, INTERNAL_ERROR, INVALID_PARAMS};
use crate::engine::EngineConfig;
use crate::error::Error;
use crate::pipeline::{Pipeline, Upload, UuidIds};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn parse_args<T: serde::de::DeserializeOwned>(
    arguments: Option<serde_json::Value>,
) -> Result<T, JsonRpcError> {
    serde_json::from_value(arguments.unwrap_or(serde_json::Value::Null)).map_err(|e| JsonRpcError {
        code: INVALID_PARAMS,
        message: format!("Invalid arguments: {e}"),
        data: None,
    })
}

fn internal_err(message: String) -> JsonRpcError {
    JsonRpcError {
        code: INTERNAL_ERROR,
        message,
        data: None,
    }
}

/// Detection failures keep their classification so clients can tell
/// "unsupported file" from "could not render".
fn detection_err(e: Error) -> JsonRpcError {
    JsonRpcError {
        code: INTERNAL_ERROR,
        message: e.to_string(),
        data: Some(serde_json::json!({ "kind": e.kind() })),
    }
}

fn to_text_result(value: &impl serde::Serialize) -> Result<serde_json::Value, JsonRpcError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| internal_err(format!("Serialization error: {e}")))?;

    serde_json::to_value(CallToolResult {
        content: vec![Content::Text { text: json }],
        is_error: None,
    })
    .map_err(|e| internal_err(format!("Internal error: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn handle_detect_tokens(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Args {
        path: std::path::PathBuf,
        mime_type: Option<String>,
        #[serde(default)]
        include_image: bool,
    }

    let args: Args = parse_args(arguments)?;

    let upload = Upload::from_path(&args.path, args.mime_type)
        .await
        .map_err(|e| internal_err(format!("Failed to read {}: {e}", args.path.display())))?;

    let pipeline = Pipeline::from_config(&EngineConfig::resolve(global));
    let detection = pipeline
        .detect(&upload, UuidIds, None)
        .await
        .map_err(detection_err)?;

    let mut result = serde_json::to_value(detection.summary())
        .map_err(|e| internal_err(format!("Serialization error: {e}")))?;
    if args.include_image {
        result["image"] = serde_json::json!({
            "format": "png",
            "data": base64::engine::general_purpose::STANDARD.encode(&detection.template.png),
        });
    }

    to_text_result(&result)
}

pub async fn handle_normalize_fields(
    arguments: Option<serde_json::Value>,
    _global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct Args {
        fields: Vec<RawField>,
    }

    let args: Args = parse_args(arguments)?;
    to_text_result(&normalize_fields(&args.fields))
}

pub async fn handle_generate_certificate_id(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct Args {
        prefix: Option<String>,
        year: Option<i32>,
    }

    let args: Args = parse_args(arguments)?;
    let prefix = args.prefix.as_deref().unwrap_or(DEFAULT_PREFIX);
    let year = args.year.unwrap_or_else(|| chrono::Utc::now().year());

    let cert_id = generate_certificate_id(prefix, year, &mut rand::thread_rng()).map_err(|e| {
        JsonRpcError {
            code: INVALID_PARAMS,
            message: e.to_string(),
            data: None,
        }
    })?;
    let url = verify_url(&global.verify_host, &cert_id).map_err(|e| internal_err(e.to_string()))?;

    to_text_result(&serde_json::json!({
        "certId": cert_id,
        "verifyUrl": url,
    }))
}

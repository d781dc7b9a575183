mod templates;

use serde::{Deserialize, Serialize};

pub use super::{JsonRpcError, Tool};

const PROTOCOL_VERSION: &str = "2024-11-05";
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

// ---------------------------------------------------------------------------
// MCP payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: &'static str,
    capabilities: serde_json::Value,
    server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    arguments: Option<serde_json::Value>,
}

/// Tool output: one text block holding pretty-printed JSON.
#[derive(Debug, Serialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

fn to_json(value: impl Serialize) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError {
        code: INTERNAL_ERROR,
        message: format!("Internal error: {e}"),
        data: None,
    })
}

pub fn handle_initialize() -> Result<serde_json::Value, JsonRpcError> {
    to_json(InitializeResult {
        protocol_version: PROTOCOL_VERSION,
        capabilities: serde_json::json!({ "tools": {} }),
        server_info: ServerInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    })
}

pub fn handle_tools_list() -> Result<serde_json::Value, JsonRpcError> {
    let tools = vec![
        Tool {
            name: "detect_tokens".to_string(),
            description: "Detect placeholder tokens such as {NAME}, {DATE} or {QR_CODE} on a certificate template (PDF or image). PDFs are read from their embedded text layer first and fall back to OCR on the rendered first page; images are scanned for magenta marker regions first and fall back to OCR. Returns the strategy used, the template image size in pixels, the render scale, and the normalized field list (position, size and style per token). Fields from a PDF text layer are in PDF points; multiply by renderScale to get template pixels. An empty list means the template has no detectable placeholders.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path to the template file"
                    },
                    "mimeType": {
                        "type": "string",
                        "description": "Declared MIME type (e.g. 'application/pdf', 'image/png'). Guessed from the extension and content when omitted."
                    },
                    "includeImage": {
                        "type": "boolean",
                        "description": "Include the rendered template as base64 PNG (default: false)"
                    }
                },
                "required": ["path"]
            }),
        },
        Tool {
            name: "normalize_fields".to_string(),
            description: "Fill missing style attributes on a list of template fields: fontFamily (Arial), fontSize (16), fontWeight (normal), fontStyle (normal), textAlign (left), textColor (#000000) and lineHeight (1.2 x fontSize). The field type is derived from the name: QR_CODE and CERT_ID are 'qr', everything else is 'text'. Normalizing twice gives the same result.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "fields": {
                        "type": "array",
                        "description": "Fields with at least id, name, x, y, width, height and source",
                        "items": { "type": "object" }
                    }
                },
                "required": ["fields"]
            }),
        },
        Tool {
            name: "generate_certificate_id".to_string(),
            description: "Generate a certificate identifier in the form PREFIX-YEAR-NNN together with its verification URL (the payload for a QR_CODE field). The three-digit suffix is random and not collision free.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "prefix": {
                        "type": "string",
                        "description": "Identifier prefix (default: CERT)"
                    },
                    "year": {
                        "type": "number",
                        "description": "Issue year (default: current year)"
                    }
                },
                "required": []
            }),
        },
    ];

    to_json(serde_json::json!({ "tools": tools }))
}

pub async fn handle_tools_call(
    params: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|e| JsonRpcError {
            code: INVALID_PARAMS,
            message: format!("Invalid params: {e}"),
            data: None,
        })?;

    log::info!("MCP tool call: {}", params.name);

    match params.name.as_str() {
        "detect_tokens" => templates::handle_detect_tokens(params.arguments, global).await,
        "normalize_fields" => templates::handle_normalize_fields(params.arguments, global).await,
        "generate_certificate_id" => {
            templates::handle_generate_certificate_id(params.arguments, global).await
        }
        _ => Err(JsonRpcError {
            code: INVALID_PARAMS,
            message: format!("Unknown tool: {}", params.name),
            data: None,
        }),
    }
}

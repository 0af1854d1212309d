//! Tolerant decoding of provider response parts.
//!
//! The SDK wire shapes drift: inline image data arrives as snake_case
//! `inline_data`, camelCase `inlineData`, raw bytes, base64 strings, or a
//! data-URI smuggled inside a text part. Decoding tries a fixed ordered
//! list of strategies and represents the outcome as a sum type.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use narra_core::errors::LlmError;

/// One decoded response part.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePart {
    Text(String),
    InlineBlob { mime: String, bytes: Vec<u8> },
    DataUri(String),
}

impl ResponsePart {
    /// Decodes one raw JSON part. Strategies, in order: `inline_data`,
    /// `inlineData`, data-URI in text, plain text.
    pub fn decode(raw: &Value) -> Option<ResponsePart> {
        if let Some(blob) = decode_inline(raw.get("inline_data"), "mime_type") {
            return Some(blob);
        }
        if let Some(blob) = decode_inline(raw.get("inlineData"), "mimeType") {
            return Some(blob);
        }
        if let Some(text) = raw.get("text").and_then(Value::as_str) {
            if text.starts_with("data:image") {
                return Some(ResponsePart::DataUri(text.to_string()));
            }
            return Some(ResponsePart::Text(text.to_string()));
        }
        None
    }

    /// Extracts image bytes when this part carries any.
    pub fn image_bytes(&self) -> Option<Vec<u8>> {
        match self {
            ResponsePart::InlineBlob { bytes, .. } => Some(bytes.clone()),
            ResponsePart::DataUri(uri) => {
                let encoded = uri.split(',').nth(1)?;
                BASE64.decode(encoded.trim()).ok()
            }
            ResponsePart::Text(_) => None,
        }
    }
}

fn decode_inline(raw: Option<&Value>, mime_key: &str) -> Option<ResponsePart> {
    let obj = raw?.as_object()?;
    let mime = obj
        .get(mime_key)
        .or_else(|| obj.get("mime_type"))
        .and_then(Value::as_str)
        .unwrap_or("image/png")
        .to_string();
    let data = obj.get("data")?;
    let bytes = match data {
        Value::String(s) => BASE64.decode(s.trim()).ok()?,
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_u64().map(|b| b as u8))
            .collect::<Option<Vec<u8>>>()?,
        _ => return None,
    };
    Some(ResponsePart::InlineBlob { mime, bytes })
}

/// Concatenates the text of all parts, newline-joined.
pub fn collect_text(raw_parts: &[Value]) -> String {
    let mut out: Vec<String> = Vec::new();
    for raw in raw_parts {
        if let Some(ResponsePart::Text(text)) = ResponsePart::decode(raw) {
            if !text.trim().is_empty() {
                out.push(text);
            }
        }
    }
    out.join("\n")
}

/// Returns the first part that carries image data, trying every decoding
/// strategy in order.
pub fn first_image(raw_parts: &[Value]) -> Result<Vec<u8>, LlmError> {
    for raw in raw_parts {
        if let Some(bytes) = ResponsePart::decode(raw).and_then(|p| p.image_bytes()) {
            if !bytes.is_empty() {
                return Ok(bytes);
            }
        }
    }
    Err(LlmError::NoImageData)
}

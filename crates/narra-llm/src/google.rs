//! Google Gemini backend over the `generateContent` REST endpoint.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::{json, Value};

use narra_core::errors::LlmError;
use narra_core::models::tokens::CallUsage;

use crate::parts;
use crate::provider::{ImageRequest, MultimodalPart, TextRequest, TextResponse};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, alias = "usage_metadata")]
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct UsageMetadata {
    #[serde(default, alias = "prompt_token_count")]
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: u64,
    #[serde(default, alias = "candidates_token_count")]
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: u64,
}

pub fn generate_text(
    api_key: &str,
    req: &TextRequest,
    binary_parts: &[MultimodalPart],
) -> Result<TextResponse, LlmError> {
    let mut user_parts: Vec<Value> = vec![json!({"text": req.user_prompt})];
    for part in binary_parts {
        user_parts.push(json!({
            "inline_data": {
                "mime_type": part.mime_type,
                "data": BASE64.encode(&part.data),
            }
        }));
    }

    let mut generation_config = json!({"temperature": req.temperature});
    if let Some(mime) = &req.response_mime_type {
        generation_config["responseMimeType"] = json!(mime);
    }
    if let Some(max) = req.max_output_tokens {
        generation_config["maxOutputTokens"] = json!(max);
    }

    let body = json!({
        "system_instruction": {"parts": [{"text": req.system_prompt}]},
        "contents": [{"role": "user", "parts": user_parts}],
        "generationConfig": generation_config,
    });

    let parsed: GenerateResponse = post(api_key, &req.model, req.timeout, &body)?;
    let raw_parts = candidate_parts(parsed.candidates)?;
    let text = parts::collect_text(&raw_parts);
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse {
            model: req.model.clone(),
        });
    }

    Ok(TextResponse {
        text,
        usage: usage_from(parsed.usage_metadata, &req.model),
    })
}

pub fn generate_image(api_key: &str, req: &ImageRequest) -> Result<Vec<u8>, LlmError> {
    let mut image_config = json!({"aspectRatio": req.aspect_ratio});
    if let Some(size) = &req.image_size {
        image_config["imageSize"] = json!(size);
    }

    let body = json!({
        "contents": [{"role": "user", "parts": [{"text": req.prompt}]}],
        "generationConfig": {
            "responseModalities": ["IMAGE", "TEXT"],
            "imageConfig": image_config,
        },
    });

    let parsed: GenerateResponse = post(api_key, &req.model, req.timeout, &body)?;
    let raw_parts = candidate_parts(parsed.candidates)?;
    parts::first_image(&raw_parts)
}

fn candidate_parts(candidates: Vec<Candidate>) -> Result<Vec<Value>, LlmError> {
    candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .ok_or_else(|| LlmError::Decode("response carried no candidates".to_string()))
}

fn usage_from(metadata: Option<UsageMetadata>, model: &str) -> CallUsage {
    let metadata = metadata.unwrap_or_default();
    CallUsage {
        input_tokens: metadata.prompt_token_count,
        output_tokens: metadata.candidates_token_count,
        model: model.to_string(),
    }
}

fn post<T: serde::de::DeserializeOwned>(
    api_key: &str,
    model: &str,
    timeout: std::time::Duration,
    body: &Value,
) -> Result<T, LlmError> {
    let url = format!("{BASE_URL}/{model}:generateContent");
    let client = reqwest::blocking::Client::new();
    let response = client
        .post(&url)
        .query(&[("key", api_key)])
        .timeout(timeout)
        .json(body)
        .send()
        .map_err(|e| LlmError::Transport(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .map_err(|e| LlmError::Transport(e.to_string()))?;
    if !status.is_success() {
        return Err(LlmError::Http {
            status: status.as_u16(),
            body: truncate(&text, 500),
        });
    }
    serde_json::from_str(&text).map_err(|e| LlmError::Decode(e.to_string()))
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

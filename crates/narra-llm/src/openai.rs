//! OpenAI backend over the chat completions REST endpoint.

use serde::Deserialize;
use serde_json::json;

use narra_core::errors::LlmError;
use narra_core::models::tokens::CallUsage;

use crate::provider::{TextRequest, TextResponse};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

pub fn generate_text(api_key: &str, req: &TextRequest) -> Result<TextResponse, LlmError> {
    let json_mode = req.response_mime_type.as_deref() == Some("application/json");
    let user_prompt = if json_mode {
        ensure_json_hint(&req.user_prompt)
    } else {
        req.user_prompt.clone()
    };

    let mut body = json!({
        "model": req.model,
        "messages": [
            {"role": "system", "content": req.system_prompt},
            {"role": "user", "content": user_prompt},
        ],
        "temperature": req.temperature,
    });
    if let Some(max) = req.max_output_tokens {
        body["max_completion_tokens"] = json!(max);
    }
    // JSON mode maps onto response_format; the prompt must mention JSON
    // or the API rejects the request, hence the hint above.
    if json_mode {
        body["response_format"] = json!({"type": "json_object"});
    }

    let client = reqwest::blocking::Client::new();
    let response = client
        .post(COMPLETIONS_URL)
        .bearer_auth(api_key)
        .timeout(req.timeout)
        .json(&body)
        .send()
        .map_err(|e| LlmError::Transport(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .map_err(|e| LlmError::Transport(e.to_string()))?;
    if !status.is_success() {
        return Err(LlmError::Http {
            status: status.as_u16(),
            body: text.chars().take(500).collect(),
        });
    }

    let parsed: ChatResponse =
        serde_json::from_str(&text).map_err(|e| LlmError::Decode(e.to_string()))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    if content.trim().is_empty() {
        return Err(LlmError::EmptyResponse {
            model: req.model.clone(),
        });
    }

    let usage = parsed.usage.unwrap_or_default();
    Ok(TextResponse {
        text: content,
        usage: CallUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            model: req.model.clone(),
        },
    })
}

/// Ensures the user prompt satisfies JSON mode's "mention JSON" rule.
pub fn ensure_json_hint(prompt: &str) -> String {
    if prompt.to_lowercase().contains("json") {
        prompt.to_string()
    } else {
        format!("{prompt}\n\nRispondi esclusivamente con un oggetto JSON valido.")
    }
}

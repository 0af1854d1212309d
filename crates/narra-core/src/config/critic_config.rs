//! Literary critic agent configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticConfig {
    pub default_model: String,
    pub fallback_model: String,
    pub temperature: f64,
    pub max_retries: u32,
    /// When "application/json", JSON mode is requested from the provider.
    pub response_mime_type: Option<String>,
    /// Character cap for the text-extraction path, sized to the model's
    /// context window.
    pub max_pdf_chars: usize,
    /// Optional prompt overrides; the built-in prompts apply otherwise.
    pub system_prompt: Option<String>,
    pub user_prompt: Option<String>,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            default_model: "gemini-3-pro-preview".to_string(),
            fallback_model: "gemini-3-flash-preview".to_string(),
            temperature: 0.3,
            max_retries: 2,
            response_mime_type: Some("application/json".to_string()),
            max_pdf_chars: 1_500_000,
            system_prompt: None,
            user_prompt: None,
        }
    }
}

//! Model catalog: provider families, name normalization, mode mapping and
//! the temperature version rule. Pure functions, no I/O.

use serde::{Deserialize, Serialize};

use crate::models::user::CreditMode;

/// The two provider families the gateway can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Google,
    OpenAi,
}

impl ModelFamily {
    /// Prefix-based detection: gpt*/o1*/o3* → OpenAI; gemini*/claude* →
    /// Google; unknown names default to Google for backward compatibility.
    pub fn of(model_name: &str) -> Self {
        let lower = model_name.to_lowercase();
        if lower.starts_with("gpt") || lower.starts_with("o1") || lower.starts_with("o3") {
            ModelFamily::OpenAi
        } else {
            ModelFamily::Google
        }
    }

    /// Whether the provider accepts PDF bytes as multimodal input.
    /// This is a capability gap of the provider, not a design choice.
    pub fn accepts_pdf(&self) -> bool {
        matches!(self, ModelFamily::Google)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Google => "google",
            ModelFamily::OpenAi => "openai",
        }
    }
}

/// Collapses user-facing aliases to provider-native model ids.
pub fn normalize_model(model_name: &str) -> String {
    if model_name.is_empty() {
        return "gemini-3-pro-preview".to_string();
    }
    let lower = model_name.to_lowercase();

    if lower.contains("gemini-3-pro") {
        "gemini-3-pro-preview".to_string()
    } else if lower.contains("gemini-3-flash") {
        "gemini-3-flash-preview".to_string()
    } else if lower.contains("gemini-3-ultra") {
        "gemini-3-ultra-preview".to_string()
    } else if lower.contains("gemini-2.5-pro") {
        "gemini-2.5-pro".to_string()
    } else if lower.contains("gemini-2.5-flash") {
        "gemini-2.5-flash".to_string()
    } else if lower.contains("gpt-5.2-pro") {
        "gpt-5.2-pro".to_string()
    } else if lower.contains("gpt-5.2-instant") || lower.contains("gpt-5.2-chat") {
        "gpt-5.2-chat-latest".to_string()
    } else if lower.contains("gpt-5.2") {
        "gpt-5.2".to_string()
    } else if lower.contains("gpt-4o") {
        // Keep the full name (gpt-4o, gpt-4o-mini, dated snapshots).
        model_name.to_string()
    } else if lower.contains("gpt-4-turbo") {
        "gpt-4-turbo".to_string()
    } else if lower.contains("gpt-4") {
        "gpt-4".to_string()
    } else {
        model_name.to_string()
    }
}

/// Maps the user's model selection to the id used for chapter writing.
/// Unknown names fall back to the cheapest model.
pub fn map_writer_model(model_name: &str) -> &'static str {
    let lower = model_name.to_lowercase();
    if lower.contains("gemini-2.5-flash") {
        "gemini-2.5-flash"
    } else if lower.contains("gemini-2.5-pro") {
        "gemini-2.5-pro"
    } else if lower.contains("gemini-3-flash") {
        "gemini-3-flash-preview"
    } else if lower.contains("gemini-3-pro") {
        "gemini-3-pro-preview"
    } else {
        "gemini-2.5-flash"
    }
}

/// Derives the credit mode from a model name. Unknown names count as
/// Flash so they draw from the largest pool.
pub fn mode_of(model_name: &str) -> CreditMode {
    let lower = model_name.to_lowercase();
    if lower.contains("ultra") {
        CreditMode::Ultra
    } else if lower.contains("pro") && !lower.contains("flash") {
        CreditMode::Pro
    } else {
        CreditMode::Flash
    }
}

/// Display label for library views; unknown models get a neutral label
/// instead of a mode.
pub fn mode_label(model_name: Option<&str>) -> String {
    let Some(name) = model_name else {
        return "Sconosciuto".to_string();
    };
    let lower = name.to_lowercase();
    if lower.contains("ultra") {
        "Ultra".to_string()
    } else if lower.contains("flash") {
        "Flash".to_string()
    } else if lower.contains("pro") {
        "Pro".to_string()
    } else {
        "Sconosciuto".to_string()
    }
}

/// Short model tag used in rendered PDF filenames.
pub fn model_abbreviation(model_name: &str) -> String {
    let lower = model_name.to_lowercase();
    if lower.contains("gemini-2.5-flash") {
        "g25f".to_string()
    } else if lower.contains("gemini-2.5-pro") {
        "g25p".to_string()
    } else if lower.contains("gemini-3-flash") {
        "g3f".to_string()
    } else if lower.contains("gemini-3-pro") {
        "g3p".to_string()
    } else {
        let cleaned: String = model_name
            .replace("gemini-", "g")
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect();
        cleaned.chars().take(6).collect()
    }
}

/// Default temperature by model generation: 2.5-class models run
/// deterministic, 3.x-class models run at 1.0.
pub fn default_temperature(model_name: &str) -> f64 {
    let lower = model_name.to_lowercase();
    if lower.contains("2.5") {
        0.0
    } else if lower.contains('3') {
        1.0
    } else {
        0.0
    }
}

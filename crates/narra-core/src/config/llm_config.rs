//! Gateway-level LLM settings: retries, fallback models, temperatures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Total attempts per gateway call (first try included).
    pub max_retries: u32,
    /// Family-local fallback used from the second attempt onward.
    pub fallback_models: BTreeMap<String, String>,
    /// Per-agent temperature overrides; the model-version rule applies
    /// otherwise.
    pub agent_temperatures: BTreeMap<String, f64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let mut fallback_models = BTreeMap::new();
        fallback_models.insert(
            "gemini-3-pro-preview".to_string(),
            "gemini-3-flash-preview".to_string(),
        );
        fallback_models.insert(
            "gemini-3-flash-preview".to_string(),
            "gemini-2.5-flash".to_string(),
        );
        fallback_models.insert(
            "gemini-2.5-pro".to_string(),
            "gemini-2.5-flash".to_string(),
        );
        fallback_models.insert("gpt-5.2-pro".to_string(), "gpt-5.2".to_string());
        fallback_models.insert("gpt-5.2".to_string(), "gpt-5.2-chat-latest".to_string());
        Self {
            max_retries: 3,
            fallback_models,
            agent_temperatures: BTreeMap::new(),
        }
    }
}

impl LlmConfig {
    pub fn fallback_for(&self, model: &str) -> Option<&str> {
        self.fallback_models.get(model).map(String::as_str)
    }

    /// Temperature for an agent: explicit override first, then the
    /// model-version rule.
    pub fn temperature_for(&self, agent_name: &str, model_name: &str) -> f64 {
        self.agent_temperatures
            .get(agent_name)
            .copied()
            .unwrap_or_else(|| crate::catalog::default_temperature(model_name))
    }
}

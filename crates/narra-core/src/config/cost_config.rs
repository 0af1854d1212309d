//! Cost accounting: pricing table, token estimates, currency conversion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-million-token USD pricing for one model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCost {
    pub input_cost_per_million: f64,
    pub output_cost_per_million: f64,
}

impl Default for ModelCost {
    fn default() -> Self {
        Self {
            input_cost_per_million: 1.0,
            output_cost_per_million: 3.0,
        }
    }
}

/// Token estimates used by the forward (pre-generation) cost estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenEstimates {
    pub draft_input_base: u64,
    pub draft_output_per_page: u64,
    pub outline_input_base: u64,
    pub outline_output_base: u64,
    /// Fixed context tokens every chapter call carries on top of the
    /// accumulated previous chapters.
    pub chapter_context_base: u64,
    pub critique_input_multiplier: f64,
    pub critique_output_base: u64,
}

impl Default for TokenEstimates {
    fn default() -> Self {
        Self {
            draft_input_base: 800,
            draft_output_per_page: 12,
            outline_input_base: 3000,
            outline_output_base: 2000,
            chapter_context_base: 8000,
            critique_input_multiplier: 1.2,
            critique_output_base: 1200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub tokens_per_page: u64,
    pub model_costs: BTreeMap<String, ModelCost>,
    pub exchange_rate_usd_to_eur: f64,
    pub image_generation_cost: f64,
    pub currency: String,
    pub token_estimates: TokenEstimates,
}

impl Default for CostConfig {
    fn default() -> Self {
        let mut model_costs = BTreeMap::new();
        model_costs.insert(
            "gemini-2.5-flash".to_string(),
            ModelCost {
                input_cost_per_million: 0.30,
                output_cost_per_million: 2.50,
            },
        );
        model_costs.insert(
            "gemini-2.5-pro".to_string(),
            ModelCost {
                input_cost_per_million: 1.25,
                output_cost_per_million: 10.0,
            },
        );
        model_costs.insert(
            "gemini-3-flash-preview".to_string(),
            ModelCost {
                input_cost_per_million: 0.50,
                output_cost_per_million: 3.0,
            },
        );
        model_costs.insert(
            "gemini-3-pro-preview".to_string(),
            ModelCost {
                input_cost_per_million: 2.0,
                output_cost_per_million: 12.0,
            },
        );
        model_costs.insert(
            "gpt-5.2".to_string(),
            ModelCost {
                input_cost_per_million: 1.75,
                output_cost_per_million: 14.0,
            },
        );
        model_costs.insert(
            "gpt-5.2-pro".to_string(),
            ModelCost {
                input_cost_per_million: 18.0,
                output_cost_per_million: 140.0,
            },
        );
        Self {
            tokens_per_page: 350,
            model_costs,
            exchange_rate_usd_to_eur: 0.92,
            image_generation_cost: 0.02,
            currency: "EUR".to_string(),
            token_estimates: TokenEstimates::default(),
        }
    }
}

impl CostConfig {
    /// Pricing lookup with substring fallbacks for model-name variants;
    /// unknown models get the default rate.
    pub fn pricing_for(&self, model_name: &str) -> ModelCost {
        let normalized = model_name.to_lowercase().replace('_', "-");
        if let Some(cost) = self.model_costs.get(&normalized) {
            return *cost;
        }
        for key in [
            "gemini-2.5-flash",
            "gemini-2.5-pro",
            "gemini-3-flash-preview",
            "gemini-3-pro-preview",
            "gpt-5.2-pro",
            "gpt-5.2",
            "gpt-4o-mini",
            "gpt-4o",
            "gpt-4-turbo",
            "gpt-4",
        ] {
            // Match on the family stem (e.g. "gemini-3-flash" inside the
            // canonical "-preview" key).
            let stem = key.trim_end_matches("-preview");
            if normalized.contains(stem) {
                if let Some(cost) = self.model_costs.get(key) {
                    return *cost;
                }
            }
        }
        self.model_costs
            .get("default")
            .copied()
            .unwrap_or_default()
    }
}

pub mod cost_config;
pub mod cover_config;
pub mod credits_config;
pub mod critic_config;
pub mod llm_config;
pub mod retry_config;
pub mod storage_config;
pub mod time_config;
pub mod timeouts_config;
pub mod validation_config;

use serde::{Deserialize, Serialize};

pub use cost_config::{CostConfig, ModelCost, TokenEstimates};
pub use cover_config::CoverConfig;
pub use credits_config::CreditsConfig;
pub use critic_config::CriticConfig;
pub use llm_config::LlmConfig;
pub use retry_config::{ChapterRetry, PhaseRetry, RetryConfig};
pub use storage_config::StorageConfig;
pub use time_config::{LinearParams, TimeEstimationConfig};
pub use timeouts_config::TimeoutsConfig;
pub use validation_config::ValidationConfig;

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NarraConfig {
    pub timeouts: TimeoutsConfig,
    pub retry: RetryConfig,
    pub validation: ValidationConfig,
    pub time_estimation: TimeEstimationConfig,
    pub cover: CoverConfig,
    pub cost: CostConfig,
    pub critic: CriticConfig,
    pub llm: LlmConfig,
    pub credits: CreditsConfig,
    pub storage: StorageConfig,
}

impl NarraConfig {
    /// Load config from a TOML string, falling back to defaults for
    /// missing fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load config from a TOML file; a missing file yields the defaults.
    pub fn load(path: &std::path::Path) -> Result<Self, crate::NarraError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| crate::NarraError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&raw)
            .map_err(|e| crate::NarraError::Config(format!("parse {}: {e}", path.display())))
    }
}

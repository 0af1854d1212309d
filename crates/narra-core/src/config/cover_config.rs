//! Cover image generation settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    pub aspect_ratio: String,
    pub primary_model: String,
    pub fallback_model: String,
    /// Optional resolution hint (e.g. "2K"); provider-specific.
    pub image_size: Option<String>,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: "2:3".to_string(),
            primary_model: "gemini-3-pro-image-preview".to_string(),
            fallback_model: "gemini-2.5-flash-image".to_string(),
            image_size: None,
        }
    }
}

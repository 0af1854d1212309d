//! Weekly credit quotas per generation mode.

use serde::{Deserialize, Serialize};

use crate::models::user::ModeCredits;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditsConfig {
    pub weekly_flash: i64,
    pub weekly_pro: i64,
    pub weekly_ultra: i64,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            weekly_flash: 10,
            weekly_pro: 5,
            weekly_ultra: 1,
        }
    }
}

impl CreditsConfig {
    pub fn weekly_pool(&self) -> ModeCredits {
        ModeCredits {
            flash: self.weekly_flash,
            pro: self.weekly_pro,
            ultra: self.weekly_ultra,
        }
    }
}

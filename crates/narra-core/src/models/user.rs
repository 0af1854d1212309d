//! User identity and the per-mode credit pools.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

/// One of the three generation modes, derived from the selected model.
/// Drives the credit pool, pricing and time-estimate parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditMode {
    Flash,
    Pro,
    Ultra,
}

impl CreditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditMode::Flash => "flash",
            CreditMode::Pro => "pro",
            CreditMode::Ultra => "ultra",
        }
    }

    /// Display label for library views.
    pub fn label(&self) -> &'static str {
        match self {
            CreditMode::Flash => "Flash",
            CreditMode::Pro => "Pro",
            CreditMode::Ultra => "Ultra",
        }
    }
}

impl std::fmt::Display for CreditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Weekly credit pools, one counter per mode.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModeCredits {
    pub flash: i64,
    pub pro: i64,
    pub ultra: i64,
}

impl ModeCredits {
    pub fn get(&self, mode: CreditMode) -> i64 {
        match mode {
            CreditMode::Flash => self.flash,
            CreditMode::Pro => self.pro,
            CreditMode::Ultra => self.ultra,
        }
    }
}

/// A registered user. Password-reset and verification token flows live
/// behind the email boundary and are not part of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub privacy_accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub marketing_accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub credits: ModeCredits,
    #[serde(default)]
    pub credits_reset_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

//! Per-phase API timeouts.

use serde::{Deserialize, Serialize};

/// Timeouts in milliseconds for each phase's outbound calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub submit_form_ms: u64,
    pub generate_questions_ms: u64,
    pub generate_draft_ms: u64,
    pub generate_outline_ms: u64,
    pub chapter_generation_ms: u64,
    pub critique_ms: u64,
    pub cover_generation_ms: u64,
    pub download_pdf_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            submit_form_ms: 30_000,
            generate_questions_ms: 60_000,
            generate_draft_ms: 120_000,
            generate_outline_ms: 120_000,
            chapter_generation_ms: 300_000,
            critique_ms: 300_000,
            cover_generation_ms: 120_000,
            download_pdf_ms: 300_000,
        }
    }
}

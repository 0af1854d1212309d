//! Retry policy for the background generation phases.

use serde::{Deserialize, Serialize};

/// Retry settings for one preparatory phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseRetry {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    /// Sleep between attempts.
    pub sleep_seconds: u64,
}

impl Default for PhaseRetry {
    fn default() -> Self {
        Self {
            max_retries: 2,
            sleep_seconds: 2,
        }
    }
}

/// Retry settings for chapter generation inside the writing loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterRetry {
    /// Total attempts per chapter.
    pub max_retries: u32,
    /// A chapter shorter than this (chars) counts as a failed attempt.
    pub min_chapter_length: usize,
}

impl Default for ChapterRetry {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_chapter_length: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub questions_generation: PhaseRetry,
    pub draft_generation: PhaseRetry,
    pub outline_generation: PhaseRetry,
    pub chapter_generation: ChapterRetry,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            questions_generation: PhaseRetry {
                max_retries: 2,
                sleep_seconds: 2,
            },
            // The draft job is single-shot: revisions go through the
            // user-feedback loop instead.
            draft_generation: PhaseRetry {
                max_retries: 1,
                sleep_seconds: 0,
            },
            outline_generation: PhaseRetry {
                max_retries: 2,
                sleep_seconds: 3,
            },
            chapter_generation: ChapterRetry::default(),
        }
    }
}

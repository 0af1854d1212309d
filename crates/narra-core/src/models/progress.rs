//! Progress subdocuments: the writing-phase progress (merge-safe) and the
//! generic per-phase progress used by the preparatory jobs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// State of the chapter-writing phase.
///
/// This subdocument is updated from several paths (orchestrator, library
/// backfill, completion bookkeeping), so updates go through
/// [`WritingProgress::apply`] which only touches the fields the caller
/// provides. Keys written by newer code than the reader land in `extra`
/// and survive a read-modify-write cycle.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct WritingProgress {
    pub current_step: u32,
    pub total_steps: u32,
    pub current_section_name: Option<String>,
    pub is_complete: bool,
    pub is_paused: bool,
    pub error: Option<String>,
    pub total_pages: Option<u32>,
    pub completed_chapters_count: Option<u32>,
    pub estimated_cost: Option<f64>,
    pub writing_time_minutes: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// The fields a progress update is authorized to set. Core fields are
/// always written; optional fields only when present.
#[derive(Debug, Clone, Default)]
pub struct WritingProgressPatch {
    pub current_step: u32,
    pub total_steps: u32,
    pub current_section_name: Option<String>,
    pub is_complete: bool,
    pub is_paused: bool,
    pub error: Option<String>,
    pub total_pages: Option<u32>,
    pub completed_chapters_count: Option<u32>,
}

impl WritingProgressPatch {
    /// A plain step update: not complete, not paused, no error.
    pub fn step(current_step: u32, total_steps: u32, section: Option<&str>) -> Self {
        Self {
            current_step,
            total_steps,
            current_section_name: section.map(str::to_string),
            ..Self::default()
        }
    }
}

impl WritingProgress {
    /// Merge-safe update: core fields are overwritten, `total_pages` and
    /// `completed_chapters_count` only when the patch carries them, and
    /// everything else (`estimated_cost`, `writing_time_minutes`, unknown
    /// extras) is preserved.
    pub fn apply(&mut self, patch: &WritingProgressPatch) {
        self.current_step = patch.current_step;
        self.total_steps = patch.total_steps;
        self.current_section_name = patch.current_section_name.clone();
        self.is_complete = patch.is_complete;
        self.is_paused = patch.is_paused;
        self.error = patch.error.clone();
        if let Some(pages) = patch.total_pages {
            self.total_pages = Some(pages);
        }
        if let Some(count) = patch.completed_chapters_count {
            self.completed_chapters_count = Some(count);
        }
    }
}

/// Status of a preparatory generation phase (questions, draft, outline).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Progress document for a preparatory phase. The caller polls it; the
/// background job writes `running` → `completed(result)` or
/// `failed(error)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub status: PhaseStatus,
    #[serde(default)]
    pub current_step: u32,
    #[serde(default)]
    pub total_steps: u32,
    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl PhaseProgress {
    pub fn running() -> Self {
        Self {
            status: PhaseStatus::Running,
            current_step: 0,
            total_steps: 1,
            progress_percentage: 0.0,
            error: None,
            result: None,
        }
    }

    pub fn completed(result: Value) -> Self {
        Self {
            status: PhaseStatus::Completed,
            current_step: 1,
            total_steps: 1,
            progress_percentage: 100.0,
            error: None,
            result: Some(result),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: PhaseStatus::Failed,
            current_step: 0,
            total_steps: 1,
            progress_percentage: 0.0,
            error: Some(error.into()),
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_preserves_unmentioned_fields() {
        let mut progress = WritingProgress {
            current_step: 2,
            total_steps: 5,
            estimated_cost: Some(1.25),
            writing_time_minutes: Some(12.0),
            ..Default::default()
        };
        progress
            .extra
            .insert("future_field".to_string(), Value::from(42));

        progress.apply(&WritingProgressPatch::step(3, 5, Some("Capitolo 4")));

        assert_eq!(progress.current_step, 3);
        assert_eq!(progress.estimated_cost, Some(1.25));
        assert_eq!(progress.writing_time_minutes, Some(12.0));
        assert_eq!(progress.extra["future_field"], Value::from(42));
    }

    #[test]
    fn unknown_keys_roundtrip_through_serde() {
        let json = r#"{
            "current_step": 1,
            "total_steps": 3,
            "is_complete": false,
            "is_paused": false,
            "shiny_new_field": "kept"
        }"#;
        let progress: WritingProgress = serde_json::from_str(json).unwrap();
        assert_eq!(progress.extra["shiny_new_field"], Value::from("kept"));

        let back = serde_json::to_value(&progress).unwrap();
        assert_eq!(back["shiny_new_field"], Value::from("kept"));
    }
}

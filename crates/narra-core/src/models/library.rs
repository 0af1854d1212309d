//! Library view types: per-book entries and aggregate statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::{CritiqueStatus, SessionStatus};

/// One book as shown in the library. `llm_model` carries the mode label
/// (Flash/Pro/Ultra), not the raw model id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub session_id: String,
    pub title: String,
    pub author: String,
    pub llm_model: String,
    pub genre: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub total_chapters: u32,
    pub completed_chapters: u32,
    pub total_pages: Option<u32>,
    pub critique_score: Option<f64>,
    pub critique_status: Option<CritiqueStatus>,
    pub pdf_path: Option<String>,
    pub pdf_filename: Option<String>,
    pub cover_image_path: Option<String>,
    pub writing_time_minutes: Option<f64>,
    /// Post-hoc token-based cost in EUR; never a forward estimate.
    pub estimated_cost: Option<f64>,
    // Recipient-side fields for shared books.
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default)]
    pub shared_by_id: Option<String>,
    #[serde(default)]
    pub shared_by_name: Option<String>,
}

/// Aggregate statistics over a set of library entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total_books: usize,
    pub completed_books: usize,
    pub in_progress_books: usize,
    pub average_score: Option<f64>,
    pub average_pages: f64,
    pub average_writing_time_minutes: f64,
    pub books_by_model: BTreeMap<String, usize>,
    pub books_by_genre: BTreeMap<String, usize>,
    pub score_distribution: BTreeMap<String, usize>,
    pub average_score_by_model: BTreeMap<String, f64>,
    pub average_writing_time_by_model: BTreeMap<String, f64>,
    pub average_time_per_page_by_model: BTreeMap<String, f64>,
    pub average_pages_by_model: BTreeMap<String, f64>,
    pub average_cost_by_model: BTreeMap<String, f64>,
    pub average_cost_per_page_by_model: BTreeMap<String, f64>,
}

/// Per-mode comparison row for the advanced statistics view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparisonEntry {
    pub model: String,
    pub total_books: usize,
    pub completed_books: usize,
    pub average_score: Option<f64>,
    pub average_pages: f64,
    pub average_cost: Option<f64>,
    pub average_writing_time: f64,
    pub average_time_per_page: f64,
    pub score_range: BTreeMap<String, usize>,
}

/// Time-bucketed trends plus the per-mode comparison table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvancedStats {
    /// Books created per day (YYYY-MM-DD).
    pub books_over_time: BTreeMap<String, usize>,
    /// Average critique score per day.
    pub score_trend_over_time: BTreeMap<String, f64>,
    pub model_comparison: Vec<ModelComparisonEntry>,
}

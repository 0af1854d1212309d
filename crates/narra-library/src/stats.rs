//! Aggregate library statistics: pure reductions over entries.

use std::collections::BTreeMap;

use narra_core::models::library::{LibraryEntry, LibraryStats};
use narra_core::models::session::SessionStatus;

pub(crate) fn score_bucket(score: f64) -> &'static str {
    if score < 2.0 {
        "0-2"
    } else if score < 4.0 {
        "2-4"
    } else if score < 6.0 {
        "4-6"
    } else if score < 8.0 {
        "6-8"
    } else {
        "8-10"
    }
}

pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub(crate) fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn calculate_library_stats(entries: &[LibraryEntry]) -> LibraryStats {
    if entries.is_empty() {
        return LibraryStats::default();
    }

    let completed: Vec<&LibraryEntry> = entries
        .iter()
        .filter(|e| e.status == SessionStatus::Complete)
        .collect();
    let in_progress = entries.len() - completed.len();

    let scores: Vec<f64> = completed.iter().filter_map(|e| e.critique_score).collect();
    let pages: Vec<f64> = completed
        .iter()
        .filter_map(|e| e.total_pages)
        .filter(|p| *p > 0)
        .map(|p| p as f64)
        .collect();
    let times: Vec<f64> = entries
        .iter()
        .filter_map(|e| e.writing_time_minutes)
        .filter(|t| *t > 0.0)
        .collect();

    let mut books_by_model: BTreeMap<String, usize> = BTreeMap::new();
    let mut books_by_genre: BTreeMap<String, usize> = BTreeMap::new();
    for entry in entries {
        *books_by_model.entry(entry.llm_model.clone()).or_default() += 1;
        if let Some(genre) = &entry.genre {
            *books_by_genre.entry(genre.clone()).or_default() += 1;
        }
    }

    let mut score_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut mode_scores: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut mode_times: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut mode_pages: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut mode_costs: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut mode_costs_per_page: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    // Weighted per-page time: Σ minutes / Σ pages, not a mean of ratios.
    let mut mode_time_sum: BTreeMap<String, f64> = BTreeMap::new();
    let mut mode_pages_for_time: BTreeMap<String, f64> = BTreeMap::new();

    for entry in &completed {
        let mode = entry.llm_model.clone();
        if let Some(score) = entry.critique_score {
            *score_distribution
                .entry(score_bucket(score).to_string())
                .or_default() += 1;
            mode_scores.entry(mode.clone()).or_default().push(score);
        }
        if let Some(pages) = entry.total_pages.filter(|p| *p > 0) {
            mode_pages
                .entry(mode.clone())
                .or_default()
                .push(pages as f64);
        }
        if let Some(cost) = entry.estimated_cost.filter(|c| *c > 0.0) {
            mode_costs.entry(mode.clone()).or_default().push(cost);
            if let Some(pages) = entry.total_pages.filter(|p| *p > 0) {
                mode_costs_per_page
                    .entry(mode.clone())
                    .or_default()
                    .push(cost / pages as f64);
            }
        }
        if let Some(minutes) = entry.writing_time_minutes.filter(|t| *t > 0.0) {
            mode_times.entry(mode.clone()).or_default().push(minutes);
            if let Some(pages) = entry.total_pages.filter(|p| *p > 0) {
                *mode_time_sum.entry(mode.clone()).or_default() += minutes;
                *mode_pages_for_time.entry(mode.clone()).or_default() += pages as f64;
            }
        }
    }

    let reduce = |map: BTreeMap<String, Vec<f64>>, round: fn(f64) -> f64| {
        map.into_iter()
            .filter_map(|(mode, values)| average(&values).map(|avg| (mode, round(avg))))
            .collect::<BTreeMap<String, f64>>()
    };

    let average_time_per_page_by_model: BTreeMap<String, f64> = mode_pages_for_time
        .iter()
        .filter(|(_, pages)| **pages > 0.0)
        .map(|(mode, pages)| {
            let minutes = mode_time_sum.get(mode).copied().unwrap_or(0.0);
            (mode.clone(), round2(minutes / pages))
        })
        .collect();

    LibraryStats {
        total_books: entries.len(),
        completed_books: completed.len(),
        in_progress_books: in_progress,
        average_score: average(&scores).map(round2),
        average_pages: average(&pages).map(round1).unwrap_or(0.0),
        average_writing_time_minutes: average(&times).map(round1).unwrap_or(0.0),
        books_by_model,
        books_by_genre,
        score_distribution,
        average_score_by_model: reduce(mode_scores, round2),
        average_writing_time_by_model: reduce(mode_times, round1),
        average_time_per_page_by_model,
        average_pages_by_model: reduce(mode_pages, round1),
        average_cost_by_model: reduce(mode_costs, round4),
        average_cost_per_page_by_model: reduce(mode_costs_per_page, round4),
    }
}

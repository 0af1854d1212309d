//! Advanced statistics: daily trends and the per-mode comparison table.

use std::collections::BTreeMap;

use narra_core::models::library::{AdvancedStats, LibraryEntry, ModelComparisonEntry};
use narra_core::models::session::SessionStatus;

use crate::stats::{round1, round2, score_bucket};

#[derive(Default)]
struct ModeAccumulator {
    total: usize,
    completed: usize,
    scores: Vec<f64>,
    pages: Vec<f64>,
    costs: Vec<f64>,
    writing_times: Vec<f64>,
    time_sum_minutes: f64,
    pages_sum_for_time: f64,
    score_distribution: BTreeMap<String, usize>,
}

pub fn calculate_advanced_stats(entries: &[LibraryEntry]) -> AdvancedStats {
    if entries.is_empty() {
        return AdvancedStats::default();
    }

    let mut books_over_time: BTreeMap<String, usize> = BTreeMap::new();
    let mut scores_by_date: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut modes: BTreeMap<String, ModeAccumulator> = BTreeMap::new();

    for entry in entries {
        let day = entry.created_at.format("%Y-%m-%d").to_string();
        *books_over_time.entry(day.clone()).or_default() += 1;

        let acc = modes.entry(entry.llm_model.clone()).or_default();
        acc.total += 1;

        if entry.status != SessionStatus::Complete {
            continue;
        }
        acc.completed += 1;

        if let Some(score) = entry.critique_score {
            scores_by_date.entry(day).or_default().push(score);
            acc.scores.push(score);
            *acc.score_distribution
                .entry(score_bucket(score).to_string())
                .or_default() += 1;
        }
        if let Some(pages) = entry.total_pages.filter(|p| *p > 0) {
            acc.pages.push(pages as f64);
        }
        if let Some(cost) = entry.estimated_cost.filter(|c| *c > 0.0) {
            acc.costs.push(cost);
        }
        if let Some(minutes) = entry.writing_time_minutes.filter(|t| *t > 0.0) {
            acc.writing_times.push(minutes);
            if let Some(pages) = entry.total_pages.filter(|p| *p > 0) {
                acc.time_sum_minutes += minutes;
                acc.pages_sum_for_time += pages as f64;
            }
        }
    }

    let score_trend_over_time = scores_by_date
        .into_iter()
        .map(|(day, scores)| {
            let avg = scores.iter().sum::<f64>() / scores.len() as f64;
            (day, round2(avg))
        })
        .collect();

    let model_comparison = modes
        .into_iter()
        .map(|(mode, acc)| {
            let mean = |values: &[f64]| {
                if values.is_empty() {
                    None
                } else {
                    Some(values.iter().sum::<f64>() / values.len() as f64)
                }
            };
            ModelComparisonEntry {
                model: mode,
                total_books: acc.total,
                completed_books: acc.completed,
                average_score: mean(&acc.scores).map(round2),
                average_pages: mean(&acc.pages).map(round1).unwrap_or(0.0),
                average_cost: mean(&acc.costs).map(round1),
                average_writing_time: mean(&acc.writing_times).map(round1).unwrap_or(0.0),
                average_time_per_page: if acc.pages_sum_for_time > 0.0 {
                    round2(acc.time_sum_minutes / acc.pages_sum_for_time)
                } else {
                    0.0
                },
                score_range: acc.score_distribution,
            }
        })
        .collect();

    AdvancedStats {
        books_over_time,
        score_trend_over_time,
        model_comparison,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(day: u32, mode: &str, score: Option<f64>) -> LibraryEntry {
        LibraryEntry {
            session_id: "s".to_string(),
            title: "T".to_string(),
            author: "A".to_string(),
            llm_model: mode.to_string(),
            genre: None,
            created_at: Utc.with_ymd_and_hms(2026, 7, day, 12, 0, 0).unwrap(),
            updated_at: Utc::now(),
            status: SessionStatus::Complete,
            total_chapters: 3,
            completed_chapters: 3,
            total_pages: Some(30),
            critique_score: score,
            critique_status: None,
            pdf_path: None,
            pdf_filename: None,
            cover_image_path: None,
            writing_time_minutes: Some(15.0),
            estimated_cost: Some(0.5),
            is_shared: false,
            shared_by_id: None,
            shared_by_name: None,
        }
    }

    #[test]
    fn daily_buckets_and_trend() {
        let entries = vec![
            entry(1, "Flash", Some(6.0)),
            entry(1, "Flash", Some(8.0)),
            entry(2, "Pro", Some(9.0)),
        ];
        let stats = calculate_advanced_stats(&entries);
        assert_eq!(stats.books_over_time["2026-07-01"], 2);
        assert_eq!(stats.books_over_time["2026-07-02"], 1);
        assert_eq!(stats.score_trend_over_time["2026-07-01"], 7.0);
        assert_eq!(stats.score_trend_over_time["2026-07-02"], 9.0);
    }

    #[test]
    fn comparison_rows_per_mode() {
        let entries = vec![
            entry(1, "Flash", Some(6.0)),
            entry(2, "Pro", Some(9.0)),
            entry(3, "Pro", None),
        ];
        let stats = calculate_advanced_stats(&entries);
        assert_eq!(stats.model_comparison.len(), 2);
        let pro = stats
            .model_comparison
            .iter()
            .find(|m| m.model == "Pro")
            .unwrap();
        assert_eq!(pro.total_books, 2);
        assert_eq!(pro.completed_books, 2);
        assert_eq!(pro.average_score, Some(9.0));
        assert_eq!(pro.average_time_per_page, round2(30.0 / 60.0));
    }
}

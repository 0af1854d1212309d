//! Progress tracking: page counts, total pages, and the residual-time
//! estimate polled while a book is in flight. Pure functions over the
//! session document.

use narra_core::catalog;
use narra_core::config::{TimeEstimationConfig, ValidationConfig};
use narra_core::models::session::Session;
use serde::{Deserialize, Serialize};

/// Confidence attached to a residual-time estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Pages for one span of text: `ceil(words / words_per_page)`, zero for
/// empty text, at least one page for anything non-empty.
pub fn page_count(content: &str, words_per_page: usize) -> u32 {
    if content.trim().is_empty() {
        return 0;
    }
    let words = content.split_whitespace().count();
    let per_page = words_per_page.max(1);
    words.div_ceil(per_page) as u32
}

/// Total pages of a finished book: chapter pages, one cover page, and a
/// table of contents sized by chapter count.
pub fn total_pages(session: &Session, validation: &ValidationConfig) -> u32 {
    let chapters_pages: u32 = session
        .book_chapters
        .iter()
        .map(|ch| page_count(&ch.content, validation.words_per_page))
        .sum();
    let cover_pages = 1;
    let toc_pages = session
        .book_chapters
        .len()
        .div_ceil(validation.toc_chapters_per_page.max(1)) as u32;
    chapters_pages + cover_pages + toc_pages
}

/// Residual-time estimate for an in-flight book.
///
/// The per-session measured average wins when enough chapters have been
/// timed; otherwise the per-method linear model `a·(N−k) + b·(k+1)`
/// applies. Pathological inputs (zero steps) coerce to one step with low
/// confidence rather than failing a progress poll.
pub fn residual_estimate(
    model_name: &str,
    current_step: u32,
    total_steps: u32,
    chapter_timings: &[f64],
    config: &TimeEstimationConfig,
) -> (f64, Confidence) {
    let mut low_confidence = false;
    let total = if total_steps == 0 {
        low_confidence = true;
        1
    } else {
        total_steps
    };
    let step = current_step.min(total);
    let remaining = total.saturating_sub(step);
    if remaining == 0 {
        return (0.0, Confidence::High);
    }

    let measured_avg = session_average(chapter_timings, config);
    let residual_seconds = match measured_avg {
        Some(avg) => avg * remaining as f64,
        None => {
            let method = catalog::mode_of(model_name).as_str().to_string();
            let params = config.params_for(&method);
            (params.a * remaining as f64 + params.b * (step as f64 + 1.0)).max(0.0)
        }
    };

    let confidence = if low_confidence {
        Confidence::Low
    } else if measured_avg.is_some() && step as f64 / total as f64 >= 0.5 {
        Confidence::High
    } else if step >= 1 {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    (residual_seconds / 60.0, confidence)
}

fn session_average(timings: &[f64], config: &TimeEstimationConfig) -> Option<f64> {
    if !config.use_session_avg_if_available {
        return None;
    }
    let valid: Vec<f64> = timings.iter().copied().filter(|t| *t > 0.0).collect();
    if valid.len() < config.min_chapters_for_reliable_avg {
        return None;
    }
    Some(valid.iter().sum::<f64>() / valid.len() as f64)
}

//! Cost accounting: the post-hoc cost from measured token usage, and the
//! closed-form estimate used before token data exists.

use narra_core::catalog;
use narra_core::config::CostConfig;
use narra_core::models::tokens::TokenUsage;

/// EUR cost computed from measured token usage × the pricing table.
/// Returns `None` when nothing was tracked (legacy sessions).
pub fn real_cost_eur(usage: &TokenUsage, config: &CostConfig) -> Option<f64> {
    if usage.total.input_tokens == 0 && usage.total.output_tokens == 0 {
        return None;
    }

    let phases = [
        &usage.questions,
        &usage.draft,
        &usage.outline,
        &usage.chapters,
        &usage.critique,
    ];
    let mut cost_usd = 0.0;
    for phase in phases {
        let Some(model) = &phase.model else { continue };
        let pricing = config.pricing_for(model);
        cost_usd += phase.input_tokens as f64 * pricing.input_cost_per_million / 1_000_000.0;
        cost_usd += phase.output_tokens as f64 * pricing.output_cost_per_million / 1_000_000.0;
    }

    Some(round4(cost_usd * config.exchange_rate_usd_to_eur))
}

/// Closed-form estimate of the chapter-generation cost for a finished
/// book, from page counts alone. The autoregressive input grows
/// linearly with each chapter, so the cumulative context is
/// `N·(N−1)/2 · avg_pages` on top of the per-call base context.
pub fn estimated_generation_cost(
    model_name: &str,
    num_chapters: usize,
    total_pages: u32,
    config: &CostConfig,
) -> Option<f64> {
    if num_chapters == 0 || total_pages == 0 {
        return None;
    }

    let tokens_per_page = config.tokens_per_page as f64;
    let pricing = config.pricing_for(catalog::map_writer_model(model_name));
    let context_base = config.token_estimates.chapter_context_base as f64;

    let n = num_chapters as f64;
    let avg_pages_per_chapter = total_pages as f64 / n;
    let chapters_pages = (total_pages - 1) as f64;

    let cumulative_pages_sum = (n * (n - 1.0) / 2.0) * avg_pages_per_chapter;
    let chapters_input = n * context_base + cumulative_pages_sum * tokens_per_page;
    let chapters_output = chapters_pages * tokens_per_page;

    let cost_usd = chapters_input * pricing.input_cost_per_million / 1_000_000.0
        + chapters_output * pricing.output_cost_per_million / 1_000_000.0;

    Some(round4(cost_usd * config.exchange_rate_usd_to_eur))
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

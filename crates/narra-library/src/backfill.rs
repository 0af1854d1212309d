//! Backfill: persists recomputed page counts and costs for complete
//! sessions that predate the precomputed fields. Writes go through the
//! merge-safe progress update so concurrent phases keep their fields.

use narra_core::config::NarraConfig;
use narra_core::errors::NarraResult;
use narra_core::models::progress::WritingProgressPatch;
use narra_core::models::session::SessionStatus;
use narra_engine::{cost, progress};
use narra_store::{Projection, SessionFilters, SessionStore};

#[derive(Debug, Default, Clone, Copy)]
pub struct BackfillReport {
    pub pages_written: usize,
    pub costs_written: usize,
}

pub fn backfill_missing(
    sessions: &SessionStore,
    config: &NarraConfig,
    owner: Option<&str>,
) -> NarraResult<BackfillReport> {
    let filters = SessionFilters {
        owner: owner.map(str::to_string),
        status: Some(SessionStatus::Complete),
        ..Default::default()
    };
    let candidates = sessions.list(&filters, Projection::Light)?;

    let mut report = BackfillReport::default();
    for light in candidates {
        let needs_pages = light
            .writing_progress
            .as_ref()
            .map_or(true, |p| p.total_pages.is_none());
        let needs_cost = light.real_cost_eur.is_none();
        if !needs_pages && !needs_cost {
            continue;
        }

        let Some(full) = sessions.load(&light.session_id)? else {
            continue;
        };
        if full.book_chapters.is_empty() {
            continue;
        }

        if needs_pages {
            let total_pages = progress::total_pages(&full, &config.validation);
            let existing = full.writing_progress.clone().unwrap_or_default();
            sessions.update_writing_progress(
                &full.session_id,
                &WritingProgressPatch {
                    current_step: existing.current_step,
                    total_steps: existing.total_steps,
                    current_section_name: existing.current_section_name.clone(),
                    is_complete: existing.is_complete,
                    is_paused: existing.is_paused,
                    error: existing.error.clone(),
                    total_pages: Some(total_pages),
                    completed_chapters_count: Some(full.book_chapters.len() as u32),
                },
            )?;
            report.pages_written += 1;
        }

        if needs_cost {
            let total_pages = full
                .writing_progress
                .as_ref()
                .and_then(|p| p.total_pages)
                .unwrap_or_else(|| progress::total_pages(&full, &config.validation));

            // Measured tokens win; the closed-form estimate covers books
            // generated before token tracking existed.
            if let Some(real) = cost::real_cost_eur(&full.token_usage, &config.cost) {
                sessions.set_real_cost(&full.session_id, real)?;
                report.costs_written += 1;
            } else if let Some(estimate) = cost::estimated_generation_cost(
                &full.form_data.llm_model,
                full.book_chapters.len(),
                total_pages,
                &config.cost,
            ) {
                sessions.set_estimated_cost(&full.session_id, estimate)?;
                report.costs_written += 1;
            }
        }
    }

    tracing::info!(
        pages = report.pages_written,
        costs = report.costs_written,
        "library backfill finished"
    );
    Ok(report)
}

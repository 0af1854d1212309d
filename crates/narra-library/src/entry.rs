//! Session → `LibraryEntry` conversion: mode labels, chapter-count
//! fallbacks, the canonical PDF filename, and cost/time presentation.

use std::path::Path;

use narra_core::catalog;
use narra_core::config::NarraConfig;
use narra_core::models::library::LibraryEntry;
use narra_core::models::session::{Session, SessionStatus};

/// Keeps alphanumerics, spaces, `-` and `_`; spaces become underscores.
/// Falls back to `Libro_{first-8-of-session-id}` for empty results.
pub fn sanitize_title(title: &str, session_id: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect();
    let sanitized = kept.trim_end().replace(' ', "_");
    if sanitized.is_empty() {
        let short: String = session_id.chars().take(8).collect();
        format!("Libro_{short}")
    } else {
        sanitized
    }
}

/// Canonical rendered-book filename:
/// `YYYY-MM-DD_{model_abbr}_{sanitized_title}.pdf`.
pub fn pdf_filename(session: &Session) -> String {
    let date = session.created_at.format("%Y-%m-%d");
    let abbr = catalog::model_abbreviation(&session.form_data.llm_model);
    let title = sanitize_title(
        session.current_title.as_deref().unwrap_or("Romanzo"),
        &session.session_id,
    );
    format!("{date}_{abbr}_{title}.pdf")
}

/// Converts one session (light or full projection) into a library entry.
pub fn session_to_entry(session: &Session, config: &NarraConfig) -> LibraryEntry {
    let status = session.status();

    let mut total_chapters = 0;
    let mut completed_chapters = 0;
    let mut total_pages = None;
    let mut writing_time_minutes = None;
    if let Some(progress) = &session.writing_progress {
        total_chapters = progress.total_steps;
        completed_chapters = progress
            .completed_chapters_count
            .unwrap_or(progress.current_step);
        total_pages = progress.total_pages;
        writing_time_minutes = progress.writing_time_minutes;
    }
    if completed_chapters == 0 && !session.book_chapters.is_empty() {
        completed_chapters = session.book_chapters.len() as u32;
    }
    if writing_time_minutes.is_none() {
        if let (Some(start), Some(end)) = (session.writing_start_time, session.writing_end_time)
        {
            writing_time_minutes = Some((end - start).num_milliseconds() as f64 / 60_000.0);
        }
    }

    let (pdf_path, pdf_filename) = if status == SessionStatus::Complete {
        locate_pdf(session, config)
    } else {
        (None, None)
    };

    LibraryEntry {
        session_id: session.session_id.clone(),
        title: session
            .current_title
            .clone()
            .unwrap_or_else(|| "Romanzo".to_string()),
        author: session
            .form_data
            .user_name
            .clone()
            .unwrap_or_else(|| "Autore".to_string()),
        llm_model: catalog::mode_label(Some(&session.form_data.llm_model)),
        genre: session.form_data.genre.clone(),
        created_at: session.created_at,
        updated_at: session.updated_at,
        status,
        total_chapters,
        completed_chapters,
        total_pages,
        critique_score: session.literary_critique.as_ref().map(|c| c.score),
        critique_status: session.critique_status,
        pdf_path,
        pdf_filename,
        cover_image_path: session.cover_image_path.clone(),
        writing_time_minutes,
        // Post-hoc token-based cost only; never a forward estimate here.
        estimated_cost: session.real_cost_eur,
        is_shared: false,
        shared_by_id: None,
        shared_by_name: None,
    }
}

/// With GCS the canonical path is constructed unchecked; locally the
/// file must exist on disk.
fn locate_pdf(session: &Session, config: &NarraConfig) -> (Option<String>, Option<String>) {
    let filename = pdf_filename(session);
    match &config.storage.gcs_bucket {
        Some(bucket) => (
            Some(format!("gs://{bucket}/books/{filename}")),
            Some(filename),
        ),
        None => {
            let local = Path::new(&config.storage.data_dir)
                .join("books")
                .join(&filename);
            if local.exists() {
                (Some(local.display().to_string()), Some(filename))
            } else {
                (None, None)
            }
        }
    }
}

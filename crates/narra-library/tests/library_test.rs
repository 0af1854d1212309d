//! Library projection and backfill over a real store.

use narra_core::config::NarraConfig;
use narra_core::models::form::SubmissionForm;
use narra_core::models::progress::WritingProgressPatch;
use narra_core::models::session::{Critique, SessionStatus};
use narra_core::models::tokens::Phase;
use narra_library::LibraryProjector;
use narra_store::{SessionStore, StorePool};

fn store() -> SessionStore {
    SessionStore::new(StorePool::open_in_memory().unwrap())
}

fn chapter_text() -> String {
    vec!["parola"; 500].join(" ")
}

/// A finished three-chapter book, optionally missing the precomputed
/// pages/cost fields (as books written before the tracking existed are).
fn complete_session(sessions: &SessionStore, id: &str, owner: &str, with_tracking: bool) {
    sessions
        .create(
            id,
            SubmissionForm {
                llm_model: "gemini-3-pro".to_string(),
                plot: "Trama.".to_string(),
                genre: Some("giallo".to_string()),
                user_name: Some("Anna".to_string()),
                ..Default::default()
            },
            vec![],
            Some(owner.to_string()),
        )
        .unwrap();
    sessions.update_draft(id, "bozza", None, Some("Il Diario")).unwrap();
    sessions.validate(id).unwrap();
    sessions.update_outline(id, "## C1\n## C2\n## C3", false, None).unwrap();
    for i in 0..3 {
        sessions
            .update_book_chapter(id, &format!("Capitolo {}", i + 1), &chapter_text(), i)
            .unwrap();
    }
    sessions
        .update_writing_progress(
            id,
            &WritingProgressPatch {
                current_step: 3,
                total_steps: 3,
                is_complete: true,
                ..Default::default()
            },
        )
        .unwrap();
    sessions
        .update_critique(
            id,
            Critique {
                score: 7.0,
                pros: vec![],
                cons: vec![],
                summary: "ok".to_string(),
            },
        )
        .unwrap();

    if with_tracking {
        sessions
            .update_token_usage(id, Phase::Chapters, 100_000, 50_000, "gemini-3-pro-preview")
            .unwrap();
    }
}

#[test]
fn list_computes_missing_pages_and_backfill_persists_them() {
    let sessions = store();
    complete_session(&sessions, "old-book", "u1", false);
    let projector = LibraryProjector::new(sessions.clone(), NarraConfig::default());

    // First read: pages computed on the fly, cost still unknown.
    let entries = projector.list(Some("u1")).unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.status, SessionStatus::Complete);
    // 3 chapters × 2 pages + cover + TOC.
    assert_eq!(entry.total_pages, Some(8));
    assert_eq!(entry.estimated_cost, None);
    assert_eq!(entry.llm_model, "Pro");
    assert_eq!(entry.critique_score, Some(7.0));

    // Nothing was persisted yet.
    let stored = sessions.load("old-book").unwrap().unwrap();
    assert!(stored.writing_progress.unwrap().total_pages.is_none());

    // Backfill writes pages and the closed-form cost estimate.
    let report = projector.backfill(Some("u1")).unwrap();
    assert_eq!(report.pages_written, 1);
    assert_eq!(report.costs_written, 1);

    let stored = sessions.load("old-book").unwrap().unwrap();
    let progress = stored.writing_progress.unwrap();
    assert_eq!(progress.total_pages, Some(8));
    assert_eq!(progress.completed_chapters_count, Some(3));
    // The merge-safe write kept the completion flags.
    assert!(progress.is_complete);
    assert!(progress.estimated_cost.is_some());

    // The invalidated cache serves the stable values.
    let entries = projector.list(Some("u1")).unwrap();
    assert_eq!(entries[0].total_pages, Some(8));

    // A second backfill has nothing left to do for pages.
    let report = projector.backfill(Some("u1")).unwrap();
    assert_eq!(report.pages_written, 0);
}

#[test]
fn tracked_sessions_get_the_real_token_cost() {
    let sessions = store();
    complete_session(&sessions, "tracked", "u1", true);
    let projector = LibraryProjector::new(sessions.clone(), NarraConfig::default());

    projector.backfill(Some("u1")).unwrap();

    let stored = sessions.load("tracked").unwrap().unwrap();
    let real = stored.real_cost_eur.unwrap();
    // 100k in × 2.0/M + 50k out × 12.0/M = 0.80 USD → EUR at 0.92.
    assert!((real - 0.8 * 0.92).abs() < 1e-4, "real = {real}");

    let entries = projector.list(Some("u1")).unwrap();
    assert_eq!(entries[0].estimated_cost, Some(real));
}

#[test]
fn stats_views_are_cached_and_owner_scoped() {
    let sessions = store();
    complete_session(&sessions, "a", "u1", true);
    complete_session(&sessions, "b", "u2", true);
    let projector = LibraryProjector::new(sessions.clone(), NarraConfig::default());

    let stats = projector.stats(Some("u1")).unwrap();
    assert_eq!(stats.total_books, 1);
    assert_eq!(stats.completed_books, 1);
    assert_eq!(stats.books_by_model["Pro"], 1);

    let all = projector.stats(None).unwrap();
    assert_eq!(all.total_books, 2);

    // A new session does not appear through the warm cache...
    complete_session(&sessions, "c", "u1", true);
    let cached = projector.stats(Some("u1")).unwrap();
    assert_eq!(cached.total_books, 1);

    // ...until the cache is invalidated.
    projector.invalidate_cache();
    let fresh = projector.stats(Some("u1")).unwrap();
    assert_eq!(fresh.total_books, 2);

    let advanced = projector.advanced_stats(Some("u1")).unwrap();
    assert_eq!(advanced.model_comparison.len(), 1);
    assert_eq!(advanced.model_comparison[0].completed_books, 2);
}

#[test]
fn pdf_path_is_constructed_unchecked_with_gcs() {
    let sessions = store();
    complete_session(&sessions, "gcsbook", "u1", true);

    let mut config = NarraConfig::default();
    config.storage.gcs_bucket = Some("narra-books".to_string());
    let projector = LibraryProjector::new(sessions, config);

    let entries = projector.list(Some("u1")).unwrap();
    let pdf_path = entries[0].pdf_path.as_deref().unwrap();
    assert!(pdf_path.starts_with("gs://narra-books/books/"));
    assert!(pdf_path.ends_with("_g3p_Il_Diario.pdf"));
}

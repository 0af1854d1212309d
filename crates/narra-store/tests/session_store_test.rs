//! Session store behaviour: merge-safety, version monotonicity, chapter
//! ordering, outline freeze, ownership.

use narra_core::models::form::{QuestionAnswer, SubmissionForm};
use narra_core::models::progress::WritingProgressPatch;
use narra_core::models::session::{Critique, CritiqueStatus, SessionStatus};
use narra_core::models::tokens::Phase;
use narra_store::{Projection, SessionFilters, SessionStore, StorePool};

fn setup() -> SessionStore {
    let pool = StorePool::open_in_memory().unwrap();
    SessionStore::new(pool)
}

fn sample_form(model: &str) -> SubmissionForm {
    SubmissionForm {
        llm_model: model.to_string(),
        plot: "Una villa sulla costa ligure".to_string(),
        genre: Some("giallo".to_string()),
        user_name: Some("Anna".to_string()),
        ..Default::default()
    }
}

fn create(store: &SessionStore, id: &str, owner: Option<&str>) {
    store
        .create(
            id,
            sample_form("gemini-3-pro"),
            vec![QuestionAnswer {
                question_id: "q1".to_string(),
                answer: Some("sì".to_string()),
            }],
            owner.map(str::to_string),
        )
        .unwrap();
}

#[test]
fn create_and_roundtrip() {
    let store = setup();
    create(&store, "s1", Some("u1"));

    let session = store.get("s1", Some("u1")).unwrap();
    assert_eq!(session.session_id, "s1");
    assert_eq!(session.form_data.llm_model, "gemini-3-pro");
    assert_eq!(session.question_answers.len(), 1);
    assert_eq!(session.status(), SessionStatus::Draft);
    assert_eq!(session.token_usage.chapters.calls, Some(0));
}

#[test]
fn ownership_is_enforced_for_owned_sessions() {
    let store = setup();
    create(&store, "owned", Some("u1"));
    create(&store, "legacy", None);

    assert!(store.get("owned", Some("u1")).is_ok());
    assert!(store.get("owned", Some("u2")).is_err());
    assert!(store.get("owned", None).is_err());
    // Legacy unowned sessions are globally readable.
    assert!(store.get("legacy", None).is_ok());
    assert!(store.get("legacy", Some("u2")).is_ok());
}

#[test]
fn missing_session_is_not_found() {
    let store = setup();
    let err = store.get("ghost", None).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn draft_versions_are_monotone_and_history_grows() {
    let store = setup();
    create(&store, "s1", None);

    let v1 = store
        .update_draft("s1", "prima stesura", None, Some("Il Titolo"))
        .unwrap();
    assert_eq!(v1.current_version, 1);

    let v2 = store.update_draft("s1", "seconda stesura", None, None).unwrap();
    assert_eq!(v2.current_version, 2);
    assert_eq!(v2.draft_history.len(), 2);
    assert!(v2.current_version > v1.current_version);
    // Title survives a revision that does not pass one.
    assert_eq!(v2.current_title.as_deref(), Some("Il Titolo"));
}

#[test]
fn outline_freeze_applies_only_while_writing() {
    let store = setup();
    create(&store, "s1", None);

    store.update_outline("s1", "## Capitolo 1", false, None).unwrap();
    let session = store.load("s1").unwrap().unwrap();
    assert_eq!(session.outline_version, 1);
    assert_eq!(session.status(), SessionStatus::Outline);

    // Start writing: outline becomes frozen.
    store
        .update_writing_progress("s1", &WritingProgressPatch::step(1, 3, Some("Capitolo 2")))
        .unwrap();
    let err = store
        .update_outline("s1", "## Nuovo capitolo", false, None)
        .unwrap_err();
    assert!(err.to_string().contains("frozen"));

    // Explicit opt-in bypasses the freeze and bumps the version.
    let session = store
        .update_outline("s1", "## Nuovo capitolo", true, None)
        .unwrap();
    assert_eq!(session.outline_version, 2);

    // Once complete, the freeze lifts.
    store
        .update_writing_progress(
            "s1",
            &WritingProgressPatch {
                current_step: 3,
                total_steps: 3,
                is_complete: true,
                ..Default::default()
            },
        )
        .unwrap();
    assert!(store.update_outline("s1", "## Post", false, None).is_ok());
}

#[test]
fn writing_progress_updates_are_merge_safe() {
    let store = setup();
    create(&store, "s1", None);

    store
        .update_writing_progress("s1", &WritingProgressPatch::step(0, 4, Some("Prologo")))
        .unwrap();
    store.set_estimated_cost("s1", 2.5).unwrap();

    // A later step update must not clobber estimated_cost.
    store
        .update_writing_progress("s1", &WritingProgressPatch::step(1, 4, Some("Capitolo 1")))
        .unwrap();

    let progress = store.load("s1").unwrap().unwrap().writing_progress.unwrap();
    assert_eq!(progress.current_step, 1);
    assert_eq!(progress.estimated_cost, Some(2.5));
}

#[test]
fn chapters_stay_sorted_and_unique_by_index() {
    let store = setup();
    create(&store, "s1", None);

    store.update_book_chapter("s1", "Tre", "c", 2).unwrap();
    store.update_book_chapter("s1", "Uno", "a", 0).unwrap();
    store.update_book_chapter("s1", "Due", "b", 1).unwrap();
    store.update_book_chapter("s1", "Uno bis", "a2", 0).unwrap();

    let chapters = store.load("s1").unwrap().unwrap().book_chapters;
    let indices: Vec<u32> = chapters.iter().map(|c| c.section_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(chapters[0].title, "Uno bis");
}

#[test]
fn pause_and_resume_preserve_progress_fields() {
    let store = setup();
    create(&store, "s1", None);

    store
        .update_writing_progress("s1", &WritingProgressPatch::step(1, 3, Some("Capitolo 2")))
        .unwrap();
    store.set_estimated_cost("s1", 0.8).unwrap();
    store
        .pause_writing("s1", 1, 3, Some("Capitolo 2"), "LLM unavailable")
        .unwrap();

    let paused = store.load("s1").unwrap().unwrap();
    assert_eq!(paused.status(), SessionStatus::Paused);
    let progress = paused.writing_progress.unwrap();
    assert_eq!(progress.error.as_deref(), Some("LLM unavailable"));
    assert_eq!(progress.estimated_cost, Some(0.8));

    let resumed = store.resume_writing("s1").unwrap();
    let progress = resumed.writing_progress.unwrap();
    assert!(!progress.is_paused);
    assert!(progress.error.is_none());
    assert_eq!(progress.current_step, 1);
    assert_eq!(progress.estimated_cost, Some(0.8));
}

#[test]
fn token_usage_accumulates_per_phase() {
    let store = setup();
    create(&store, "s1", None);

    store
        .update_token_usage("s1", Phase::Chapters, 1000, 400, "gemini-3-pro-preview")
        .unwrap();
    store
        .update_token_usage("s1", Phase::Chapters, 500, 200, "gemini-3-pro-preview")
        .unwrap();

    let usage = store.load("s1").unwrap().unwrap().token_usage;
    assert_eq!(usage.chapters.input_tokens, 1500);
    assert_eq!(usage.chapters.calls, Some(2));
    assert_eq!(usage.total.output_tokens, 600);
}

#[test]
fn chapter_timings_append_on_end() {
    let store = setup();
    create(&store, "s1", None);

    // Ending without a start is a no-op.
    store.end_chapter_timing("s1", None).unwrap();
    assert!(store.load("s1").unwrap().unwrap().chapter_timings.is_empty());

    let start = chrono::Utc::now();
    store.start_chapter_timing("s1", Some(start)).unwrap();
    store
        .end_chapter_timing("s1", Some(start + chrono::Duration::seconds(42)))
        .unwrap();

    let session = store.load("s1").unwrap().unwrap();
    assert_eq!(session.chapter_timings.len(), 1);
    assert!((session.chapter_timings[0] - 42.0).abs() < 0.01);
    assert!(session.chapter_start_time.is_none());
}

#[test]
fn critique_lifecycle() {
    let store = setup();
    create(&store, "s1", None);

    store
        .update_critique_status("s1", CritiqueStatus::Running, None)
        .unwrap();
    store
        .update_critique(
            "s1",
            Critique {
                score: 7.5,
                pros: vec!["ritmo".to_string()],
                cons: vec!["finale".to_string()],
                summary: "Buon esordio".to_string(),
            },
        )
        .unwrap();

    let session = store.load("s1").unwrap().unwrap();
    assert_eq!(session.critique_status, Some(CritiqueStatus::Completed));
    assert!(session.critique_error.is_none());
    assert_eq!(session.literary_critique.unwrap().score, 7.5);

    store
        .update_critique_status("s1", CritiqueStatus::Failed, Some("render failed"))
        .unwrap();
    let session = store.load("s1").unwrap().unwrap();
    assert_eq!(session.critique_status, Some(CritiqueStatus::Failed));
    // A failed status keeps the critique already present.
    assert!(session.literary_critique.is_some());
}

#[test]
fn light_projection_elides_heavy_fields() {
    let store = setup();
    create(&store, "s1", Some("u1"));
    store.update_draft("s1", "bozza", None, Some("T")).unwrap();
    store.update_outline("s1", "## Capitolo 1", false, None).unwrap();
    store.update_book_chapter("s1", "Uno", "testo lungo", 0).unwrap();

    let light = store
        .list(
            &SessionFilters {
                owner: Some("u1".to_string()),
                ..Default::default()
            },
            Projection::Light,
        )
        .unwrap();
    assert_eq!(light.len(), 1);
    assert!(light[0].book_chapters.is_empty());
    // The outline collapses to a presence marker.
    assert_eq!(light[0].current_outline.as_deref(), Some(""));
    assert_eq!(light[0].status(), SessionStatus::Outline);
    assert!(light[0].draft_history.is_empty());
    // Light rows still carry the projection-relevant fields.
    assert_eq!(light[0].current_title.as_deref(), Some("T"));
}

#[test]
fn list_filters_by_status_and_genre() {
    let store = setup();
    create(&store, "a", Some("u1"));
    create(&store, "b", Some("u1"));
    store.update_outline("b", "## Capitolo 1", false, None).unwrap();

    let filters = SessionFilters {
        owner: Some("u1".to_string()),
        status: Some(SessionStatus::Outline),
        ..Default::default()
    };
    let outlined = store.list(&filters, Projection::Full).unwrap();
    assert_eq!(outlined.len(), 1);
    assert_eq!(outlined[0].session_id, "b");

    let filters = SessionFilters {
        owner: Some("u1".to_string()),
        genre: Some("fantascienza".to_string()),
        ..Default::default()
    };
    assert!(store.list(&filters, Projection::Full).unwrap().is_empty());
}

#[test]
fn delete_removes_the_row() {
    let store = setup();
    create(&store, "s1", None);
    assert!(store.delete("s1").unwrap());
    assert!(!store.delete("s1").unwrap());
    assert!(store.load("s1").unwrap().is_none());
}

//! Preparatory background jobs: progress lifecycle, retries, token
//! accounting, and the progress poll with the residual estimate.

use std::sync::Arc;

use narra_blob::LocalBlobStore;
use narra_core::config::{CreditsConfig, NarraConfig};
use narra_core::models::form::{QuestionAnswer, SubmissionForm};
use narra_core::models::progress::PhaseStatus;
use narra_core::models::session::Session;
use narra_core::traits::{BookRenderer, NullNotifier, RenderFormat};
use narra_engine::progress::Confidence;
use narra_engine::{Engine, Services};
use narra_llm::testing::MockBackend;
use narra_llm::LlmGateway;
use narra_store::StorePool;

struct NoRenderer;

impl BookRenderer for NoRenderer {
    fn render(&self, _session: &Session, _format: RenderFormat) -> Result<Vec<u8>, String> {
        Err("rendering not available in this test".to_string())
    }
}

fn harness() -> (Engine, Arc<MockBackend>, tempfile::TempDir) {
    let mut config = NarraConfig::default();
    config.llm.max_retries = 1;
    config.retry.questions_generation.sleep_seconds = 0;
    config.retry.outline_generation.sleep_seconds = 0;
    config.credits = CreditsConfig::default();

    let pool = StorePool::open_in_memory().unwrap();
    let backend = Arc::new(MockBackend::new());
    let gateway = LlmGateway::new(backend.clone(), config.llm.clone());
    let blob_dir = tempfile::tempdir().unwrap();
    let services = Services::new(
        config,
        pool,
        gateway,
        Arc::new(LocalBlobStore::new(blob_dir.path())),
        Arc::new(NoRenderer),
        Arc::new(NullNotifier),
    );
    (Engine::new(Arc::new(services)), backend, blob_dir)
}

fn create_session(engine: &Engine, session_id: &str) {
    engine
        .services()
        .sessions
        .create(
            session_id,
            SubmissionForm {
                llm_model: "gemini-3-flash".to_string(),
                plot: "Un faro abbandonato e una custode ostinata.".to_string(),
                ..Default::default()
            },
            vec![QuestionAnswer {
                question_id: "q1".to_string(),
                answer: Some("in inverno".to_string()),
            }],
            None,
        )
        .unwrap();
}

#[test]
fn questions_job_saves_questions_and_progress() {
    let (engine, backend, _dir) = harness();
    create_session(&engine, "q");

    backend.push_text(
        r#"[{"id": "q1", "text": "Chi è la custode?", "type": "text"},
            {"id": "q2", "text": "Tono?", "type": "multiple_choice", "options": ["cupo", "lieve"]}]"#,
    );

    engine.start_questions("q", None).unwrap();
    engine.wait_for_prep("q", "questions");

    let session = engine.services().sessions.load("q").unwrap().unwrap();
    let questions = session.generated_questions.as_ref().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].id, "q1");

    let progress = session.questions_progress.as_ref().unwrap();
    assert_eq!(progress.status, PhaseStatus::Completed);
    assert_eq!(progress.progress_percentage, 100.0);
    assert!(progress.result.is_some());

    assert!(session.token_usage.questions.input_tokens > 0);
    assert_eq!(
        session.token_usage.questions.model.as_deref(),
        Some("gemini-3-pro-preview")
    );
}

#[test]
fn questions_job_retries_then_records_failure() {
    let (engine, backend, _dir) = harness();
    create_session(&engine, "qfail");

    // Two configured attempts, both fail.
    backend.push_failure("rate limited");
    backend.push_failure("rate limited again");

    engine.start_questions("qfail", None).unwrap();
    engine.wait_for_prep("qfail", "questions");

    let session = engine.services().sessions.load("qfail").unwrap().unwrap();
    let progress = session.questions_progress.as_ref().unwrap();
    assert_eq!(progress.status, PhaseStatus::Failed);
    assert!(progress.error.as_deref().unwrap().contains("rate limited"));
    assert!(session.generated_questions.is_none());
}

#[test]
fn draft_job_parses_title_and_bumps_version() {
    let (engine, backend, _dir) = harness();
    create_session(&engine, "d");

    backend.push_text("TITOLO: Il Faro d'Inverno\nTRAMA:\nLa custode scopre una lettera.");

    engine.start_draft("d", None, None).unwrap();
    engine.wait_for_prep("d", "draft");

    let session = engine.services().sessions.load("d").unwrap().unwrap();
    assert_eq!(session.current_title.as_deref(), Some("Il Faro d'Inverno"));
    assert_eq!(session.current_version, 1);
    assert!(session
        .current_draft
        .as_deref()
        .unwrap()
        .contains("lettera"));
    assert_eq!(session.draft_history.len(), 1);
    assert_eq!(
        session.draft_progress.as_ref().unwrap().status,
        PhaseStatus::Completed
    );
    // The draft phase counts its calls.
    assert_eq!(session.token_usage.draft.calls, Some(1));
}

#[test]
fn draft_revision_feeds_feedback_and_previous_draft() {
    let (engine, backend, _dir) = harness();
    create_session(&engine, "rev");

    backend.push_text("TITOLO: Prima\nTRAMA:\nPrima stesura della storia.");
    engine.start_draft("rev", None, None).unwrap();
    engine.wait_for_prep("rev", "draft");

    backend.push_text("TITOLO: Seconda\nTRAMA:\nStesura rivista con più mare.");
    engine
        .start_draft("rev", None, Some("Più scene sul mare".to_string()))
        .unwrap();
    engine.wait_for_prep("rev", "draft");

    let session = engine.services().sessions.load("rev").unwrap().unwrap();
    assert_eq!(session.current_version, 2);
    assert_eq!(session.current_title.as_deref(), Some("Seconda"));

    let calls = backend.calls.lock().unwrap();
    let revision_call = calls.last().unwrap();
    assert!(revision_call.user_prompt.contains("BOZZA PRECEDENTE"));
    assert!(revision_call.user_prompt.contains("Prima stesura"));
    assert!(revision_call.user_prompt.contains("Più scene sul mare"));
}

#[test]
fn outline_job_requires_a_validated_draft() {
    let (engine, _backend, _dir) = harness();
    create_session(&engine, "o");

    let err = engine.start_outline("o", None).unwrap_err();
    assert!(err.to_string().contains("validated"));

    let services = engine.services();
    services
        .sessions
        .update_draft("o", "Trama estesa.", None, Some("T"))
        .unwrap();
    services.sessions.validate("o").unwrap();

    engine.start_outline("o", None).unwrap();
    engine.wait_for_prep("o", "outline");

    let session = services.sessions.load("o").unwrap().unwrap();
    // The scripted backend returned the default text; the outline is
    // stored verbatim and versioned regardless of its shape.
    assert!(session.current_outline.is_some());
    assert_eq!(session.outline_version, 1);
    assert_eq!(
        session.outline_progress.as_ref().unwrap().status,
        PhaseStatus::Completed
    );
}

#[test]
fn progress_poll_attaches_the_estimate() {
    let (engine, _backend, _dir) = harness();
    create_session(&engine, "poll");

    let services = engine.services();
    services
        .sessions
        .update_writing_progress(
            "poll",
            &narra_core::models::progress::WritingProgressPatch::step(1, 4, Some("Capitolo 2")),
        )
        .unwrap();

    let progress = engine.book_progress("poll", None).unwrap();
    assert_eq!(progress.current_step, 1);
    assert_eq!(progress.total_steps, 4);
    assert!(progress.estimated_time_minutes.unwrap() > 0.0);
    assert_eq!(progress.estimated_time_confidence, Some(Confidence::Medium));

    // A later step shrinks the estimate.
    services
        .sessions
        .update_writing_progress(
            "poll",
            &narra_core::models::progress::WritingProgressPatch::step(3, 4, Some("Capitolo 4")),
        )
        .unwrap();
    let later = engine.book_progress("poll", None).unwrap();
    assert!(later.estimated_time_minutes.unwrap() < progress.estimated_time_minutes.unwrap());
}

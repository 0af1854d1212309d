//! End-to-end writing scenarios over a scripted backend: happy path,
//! pause & resume, outline freeze, credit exhaustion, cancellation, and
//! the autoregressive contract.

use std::sync::{Arc, Mutex};

use narra_blob::LocalBlobStore;
use narra_core::config::{CreditsConfig, NarraConfig};
use narra_core::models::form::SubmissionForm;
use narra_core::models::session::{CritiqueStatus, Session, SessionStatus};
use narra_core::models::user::UserRole;
use narra_core::traits::{BookRenderer, NotificationEvent, Notifier, RenderFormat};
use narra_engine::{Engine, Services};
use narra_llm::testing::{sample_pdf, MockBackend};
use narra_llm::LlmGateway;
use narra_store::StorePool;

struct FakeRenderer;

impl BookRenderer for FakeRenderer {
    fn render(&self, session: &Session, _format: RenderFormat) -> Result<Vec<u8>, String> {
        let body: String = session
            .book_chapters
            .iter()
            .map(|ch| ch.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(sample_pdf(&format!("Romanzo completo. {body}")))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<(String, String)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, user_id: &str, event: NotificationEvent) {
        self.events
            .lock()
            .unwrap()
            .push((user_id.to_string(), event.kind));
    }
}

struct Harness {
    engine: Engine,
    backend: Arc<MockBackend>,
    notifier: Arc<RecordingNotifier>,
    _blob_dir: tempfile::TempDir,
}

fn test_config(credits: CreditsConfig) -> NarraConfig {
    let mut config = NarraConfig::default();
    // Deterministic retries for scripted failures.
    config.llm.max_retries = 1;
    config.retry.chapter_generation.max_retries = 1;
    config.retry.questions_generation.sleep_seconds = 0;
    config.retry.outline_generation.sleep_seconds = 0;
    config.credits = credits;
    config
}

fn harness_with(credits: CreditsConfig) -> Harness {
    let config = test_config(credits);
    let pool = StorePool::open_in_memory().unwrap();
    let backend = Arc::new(MockBackend::new());
    let gateway = LlmGateway::new(backend.clone(), config.llm.clone());
    let blob_dir = tempfile::tempdir().unwrap();
    let notifier = Arc::new(RecordingNotifier::default());

    let services = Services::new(
        config,
        pool,
        gateway,
        Arc::new(LocalBlobStore::new(blob_dir.path())),
        Arc::new(FakeRenderer),
        notifier.clone(),
    );
    Harness {
        engine: Engine::new(Arc::new(services)),
        backend,
        notifier,
        _blob_dir: blob_dir,
    }
}

fn harness() -> Harness {
    harness_with(CreditsConfig::default())
}

const OUTLINE: &str = "# Struttura del romanzo\n\n\
    ## Capitolo 1: L'arrivo\nAnna arriva alla villa.\n\n\
    ## Capitolo 2: Il diario\nUn diario nascosto riaffiora.\n\n\
    ## Capitolo 3: La verità\nTutto si ricompone.\n";

fn chapter_text(tag: &str) -> String {
    format!("{tag}: {}", "parola narrativa ".repeat(20))
}

const CRITIQUE_JSON: &str =
    r#"{"score": 8.2, "pros": ["stile", "ritmo"], "cons": ["finale"], "summary": "Valido."}"#;

/// Creates a validated, outlined session owned by a fresh user.
fn prepare_session(harness: &Harness, session_id: &str) -> String {
    let services = harness.engine.services();
    let user = services
        .users
        .create(
            &format!("{session_id}@example.com"),
            "passphrase",
            "Anna",
            UserRole::User,
        )
        .unwrap();

    services
        .sessions
        .create(
            session_id,
            SubmissionForm {
                llm_model: "gemini-3-pro".to_string(),
                plot: "Una villa sulla costa ligure nasconde un diario.".to_string(),
                genre: Some("giallo".to_string()),
                user_name: Some("Anna".to_string()),
                ..Default::default()
            },
            vec![],
            Some(user.id.clone()),
        )
        .unwrap();
    services
        .sessions
        .update_draft(session_id, "Una trama estesa e validata.", None, Some("Il Diario"))
        .unwrap();
    services.sessions.validate(session_id).unwrap();
    services
        .sessions
        .update_outline(session_id, OUTLINE, false, None)
        .unwrap();
    user.id
}

#[test]
fn happy_path_writes_cover_and_critique() {
    let harness = harness();
    let uid = prepare_session(&harness, "happy");

    for i in 1..=3 {
        harness.backend.push_text(chapter_text(&format!("cap{i}")));
    }
    harness.backend.push_text(CRITIQUE_JSON);

    harness.engine.start_generation("happy", Some(&uid)).unwrap();
    harness.engine.wait_for_writing("happy");

    let services = harness.engine.services();
    let session = services.sessions.load("happy").unwrap().unwrap();

    assert_eq!(session.status(), SessionStatus::Complete);
    assert_eq!(session.book_chapters.len(), 3);
    let progress = session.writing_progress.as_ref().unwrap();
    assert!(progress.is_complete);
    assert_eq!(progress.completed_chapters_count, Some(3));
    assert!(progress.writing_time_minutes.is_some());

    assert_eq!(session.chapter_timings.len(), 3);
    assert_eq!(session.token_usage.chapters.calls, Some(3));
    assert!(session.token_usage.total.output_tokens > 0);

    let cover = session.cover_image_path.as_deref().unwrap();
    assert!(cover.contains("covers/") && cover.ends_with("happy_cover.png"));

    assert_eq!(session.critique_status, Some(CritiqueStatus::Completed));
    let critique = session.literary_critique.unwrap();
    assert!((0.0..=10.0).contains(&critique.score));
    assert_eq!(critique.score, 8.2);

    // One pro credit consumed at start.
    let (credits, _, _) = services.ledger.get(&uid).unwrap();
    assert_eq!(credits.pro, CreditsConfig::default().weekly_pro - 1);

    // The completion notification went out.
    let events = harness.notifier.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1, "book_completed");
}

#[test]
fn chapter_failure_pauses_and_resume_completes() {
    let harness = harness();
    let uid = prepare_session(&harness, "pausable");

    // Chapter 0 succeeds, chapter 1 fails deterministically.
    harness.backend.push_text(chapter_text("cap1"));
    harness.backend.push_failure("model overloaded");

    harness.engine.start_generation("pausable", Some(&uid)).unwrap();
    harness.engine.wait_for_writing("pausable");

    let services = harness.engine.services();
    let session = services.sessions.load("pausable").unwrap().unwrap();
    assert_eq!(session.status(), SessionStatus::Paused);
    assert_eq!(session.book_chapters.len(), 1);
    let progress = session.writing_progress.as_ref().unwrap();
    assert_eq!(progress.current_step, 1);
    assert!(progress.is_paused);
    assert!(progress.error.as_deref().unwrap().contains("Capitolo 2"));
    // Only the successful chapter was timed.
    assert_eq!(session.chapter_timings.len(), 1);

    // Resume regenerates chapter 1 and finishes the book.
    harness.backend.push_text(chapter_text("cap2"));
    harness.backend.push_text(chapter_text("cap3"));
    harness.backend.push_text(CRITIQUE_JSON);

    harness.engine.resume_generation("pausable", Some(&uid)).unwrap();
    harness.engine.wait_for_writing("pausable");

    let session = services.sessions.load("pausable").unwrap().unwrap();
    assert_eq!(session.status(), SessionStatus::Complete);
    assert_eq!(session.book_chapters.len(), 3);
    let progress = session.writing_progress.as_ref().unwrap();
    assert!(!progress.is_paused);
    assert!(progress.error.is_none());
}

#[test]
fn outline_is_frozen_while_paused_unless_opted_in() {
    let harness = harness();
    let uid = prepare_session(&harness, "frozen");

    harness.backend.push_failure("boom");
    harness.engine.start_generation("frozen", Some(&uid)).unwrap();
    harness.engine.wait_for_writing("frozen");

    let services = harness.engine.services();
    let err = services
        .sessions
        .update_outline("frozen", "## Capitolo nuovo", false, None)
        .unwrap_err();
    assert!(err.to_string().contains("frozen"));

    let before = services.sessions.load("frozen").unwrap().unwrap();
    let updated = services
        .sessions
        .update_outline("frozen", "## Capitolo nuovo", true, None)
        .unwrap();
    assert_eq!(updated.outline_version, before.outline_version + 1);
    assert_eq!(updated.book_chapters.len(), before.book_chapters.len());
}

#[test]
fn exhausted_credits_block_generation() {
    let harness = harness_with(CreditsConfig {
        weekly_flash: 0,
        weekly_pro: 0,
        weekly_ultra: 0,
    });
    let uid = prepare_session(&harness, "broke");

    let err = harness.engine.start_generation("broke", Some(&uid)).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Pro"), "unexpected error: {message}");
    assert!(message.contains("resets at"));

    // No task was spawned and nothing was written.
    assert!(!harness.engine.is_writing("broke"));
    let session = harness.engine.services().sessions.load("broke").unwrap().unwrap();
    assert!(session.book_chapters.is_empty());
}

#[test]
fn generation_requires_validated_draft_and_outline() {
    let harness = harness();
    let services = harness.engine.services();
    services
        .sessions
        .create(
            "bare",
            SubmissionForm {
                llm_model: "gemini-2.5-flash".to_string(),
                plot: "Trama.".to_string(),
                ..Default::default()
            },
            vec![],
            None,
        )
        .unwrap();

    let err = harness.engine.start_generation("bare", None).unwrap_err();
    assert!(err.to_string().contains("validated"));

    services
        .sessions
        .update_draft("bare", "bozza", None, None)
        .unwrap();
    services.sessions.validate("bare").unwrap();
    let err = harness.engine.start_generation("bare", None).unwrap_err();
    assert!(err.to_string().contains("outline"));
}

#[test]
fn second_start_while_running_is_rejected() {
    let harness = harness();
    let uid = prepare_session(&harness, "dup");

    // Block the writer on an empty queue by pushing a long script only
    // after asserting; instead use chapter replies so the task runs to
    // completion, and assert on the guard while it is alive.
    harness.backend.push_text(chapter_text("cap1"));
    harness.backend.push_text(chapter_text("cap2"));
    harness.backend.push_text(chapter_text("cap3"));
    harness.backend.push_text(CRITIQUE_JSON);

    harness.engine.start_generation("dup", Some(&uid)).unwrap();
    // The second start is rejected either by the supervisor guard (task
    // alive) or by the completed-session gate (task already done).
    let second = harness.engine.start_generation("dup", Some(&uid));
    assert!(second.is_err());
    harness.engine.wait_for_writing("dup");
}

#[test]
fn cancellation_pauses_at_the_chapter_boundary() {
    let harness = harness();
    let uid = prepare_session(&harness, "cancel");

    // Cancel before start is a no-op.
    assert!(!harness.engine.cancel_generation("cancel"));

    // Script a full run so the only early exit is the cancel itself.
    harness.backend.push_text(chapter_text("cap1"));
    harness.backend.push_text(chapter_text("cap2"));
    harness.backend.push_text(chapter_text("cap3"));
    harness.backend.push_text(CRITIQUE_JSON);

    harness.engine.start_generation("cancel", Some(&uid)).unwrap();
    harness.engine.cancel_generation("cancel");
    harness.engine.wait_for_writing("cancel");

    let session = harness.engine.services().sessions.load("cancel").unwrap().unwrap();
    let progress = session.writing_progress.unwrap();
    // Either the cancel landed before a chapter boundary (paused with
    // "cancelled") or the task already passed the last check; the
    // session must be in a coherent state either way.
    if progress.is_paused {
        assert_eq!(progress.error.as_deref(), Some("cancelled"));
    } else {
        assert!(progress.is_complete);
    }
}

#[test]
fn chapter_calls_receive_exactly_the_previous_chapters() {
    let harness = harness();
    let uid = prepare_session(&harness, "auto");

    let cap1 = chapter_text("primo-capitolo-unico");
    let cap2 = chapter_text("secondo-capitolo-unico");
    let cap3 = chapter_text("terzo-capitolo-unico");
    harness.backend.push_text(cap1.clone());
    harness.backend.push_text(cap2.clone());
    harness.backend.push_text(cap3.clone());
    harness.backend.push_text(CRITIQUE_JSON);

    harness.engine.start_generation("auto", Some(&uid)).unwrap();
    harness.engine.wait_for_writing("auto");

    let calls = harness.backend.calls.lock().unwrap();
    // 3 chapter calls + 1 critique call.
    assert_eq!(calls.len(), 4);

    // k = 0: no previous chapters.
    assert!(!calls[0].user_prompt.contains("CAPITOLI PRECEDENTI"));
    // k = 1: exactly chapter 0.
    assert!(calls[1].user_prompt.contains(&cap1));
    assert!(!calls[1].user_prompt.contains(&cap2));
    // k = 2: chapters 0 and 1, in order.
    let pos1 = calls[2].user_prompt.find(&cap1).unwrap();
    let pos2 = calls[2].user_prompt.find(&cap2).unwrap();
    assert!(pos1 < pos2);
    assert!(!calls[2].user_prompt.contains(&cap3));

    // The critique call carried the PDF as an inline part.
    assert_eq!(calls[3].part_mime_types, vec!["application/pdf".to_string()]);
}

#[test]
fn openai_critic_goes_through_text_extraction() {
    let mut config = test_config(CreditsConfig::default());
    config.critic.default_model = "gpt-5.2-pro".to_string();

    let pool = StorePool::open_in_memory().unwrap();
    let backend = Arc::new(MockBackend::new());
    let gateway = LlmGateway::new(backend.clone(), config.llm.clone());
    let blob_dir = tempfile::tempdir().unwrap();
    let services = Services::new(
        config,
        pool,
        gateway,
        Arc::new(LocalBlobStore::new(blob_dir.path())),
        Arc::new(FakeRenderer),
        Arc::new(RecordingNotifier::default()),
    );
    let harness = Harness {
        engine: Engine::new(Arc::new(services)),
        backend,
        notifier: Arc::new(RecordingNotifier::default()),
        _blob_dir: blob_dir,
    };
    let uid = prepare_session(&harness, "gpt");

    harness.backend.push_text(chapter_text("cap1"));
    harness.backend.push_text(chapter_text("cap2"));
    harness.backend.push_text(chapter_text("cap3"));
    harness.backend.push_text(CRITIQUE_JSON);

    harness.engine.start_generation("gpt", Some(&uid)).unwrap();
    harness.engine.wait_for_writing("gpt");

    let session = harness.engine.services().sessions.load("gpt").unwrap().unwrap();
    assert_eq!(session.critique_status, Some(CritiqueStatus::Completed));
    assert_eq!(session.literary_critique.unwrap().score, 8.2);

    let calls = harness.backend.calls.lock().unwrap();
    let critique_call = calls.last().unwrap();
    // Text path: no inline parts, the extracted book text is in the prompt.
    assert!(critique_call.part_mime_types.is_empty());
    assert!(critique_call.user_prompt.contains("TESTO COMPLETO DEL ROMANZO"));
    assert_eq!(critique_call.model, "gpt-5.2-pro");
}

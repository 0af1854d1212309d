//! Preparatory background jobs: questions, draft, outline. Each writes
//! its phase-progress document {running → completed(result) |
//! failed(error)} and retries per config. None of them consumes a
//! credit.

use std::time::Duration;

use serde_json::json;

use narra_core::errors::NarraResult;
use narra_core::models::progress::PhaseProgress;
use narra_core::models::session::Session;
use narra_core::models::tokens::Phase;

use crate::services::Services;

pub fn run_questions_job(services: &Services, session_id: &str) {
    let retry = services.config.retry.questions_generation.clone();
    run_with_retries(
        "questions",
        retry.max_retries,
        Duration::from_secs(retry.sleep_seconds),
        |error| {
            let _ = services
                .sessions
                .update_questions_progress(session_id, PhaseProgress::failed(error));
        },
        || {
            services
                .sessions
                .update_questions_progress(session_id, PhaseProgress::running())?;
            let session = load(services, session_id)?;

            let timeout = services.timeout_ms(services.config.timeouts.generate_questions_ms);
            let output = narra_agents::generate_questions(
                &services.gateway,
                &session.form_data,
                timeout,
            )?;

            services
                .sessions
                .save_generated_questions(session_id, output.questions.clone())?;
            services.sessions.update_token_usage(
                session_id,
                Phase::Questions,
                output.usage.input_tokens,
                output.usage.output_tokens,
                &output.usage.model,
            )?;
            services.sessions.update_questions_progress(
                session_id,
                PhaseProgress::completed(json!({
                    "session_id": session_id,
                    "questions": output.questions,
                })),
            )?;
            Ok(())
        },
    );
}

/// Draft generation; on revision `user_feedback` carries the change
/// requests and the previous draft is folded into the prompt.
pub fn run_draft_job(services: &Services, session_id: &str, user_feedback: Option<String>) {
    let retry = services.config.retry.draft_generation.clone();
    run_with_retries(
        "draft",
        retry.max_retries,
        Duration::from_secs(retry.sleep_seconds),
        |error| {
            let _ = services
                .sessions
                .update_draft_progress(session_id, PhaseProgress::failed(error));
        },
        || {
            services
                .sessions
                .update_draft_progress(session_id, PhaseProgress::running())?;
            let session = load(services, session_id)?;

            let previous_draft = user_feedback
                .as_ref()
                .and_then(|_| session.current_draft.clone());
            let timeout = services.timeout_ms(services.config.timeouts.generate_draft_ms);
            let output = narra_agents::generate_draft(
                &services.gateway,
                &session.form_data,
                &session.question_answers,
                previous_draft.as_deref(),
                user_feedback.as_deref(),
                timeout,
            )?;

            let updated = services.sessions.update_draft(
                session_id,
                &output.text,
                None,
                Some(&output.title),
            )?;
            services.sessions.update_token_usage(
                session_id,
                Phase::Draft,
                output.usage.input_tokens,
                output.usage.output_tokens,
                &output.usage.model,
            )?;
            services.sessions.update_draft_progress(
                session_id,
                PhaseProgress::completed(json!({
                    "session_id": session_id,
                    "draft_text": output.text,
                    "title": output.title,
                    "version": updated.current_version,
                })),
            )?;
            Ok(())
        },
    );
}

pub fn run_outline_job(services: &Services, session_id: &str) {
    let retry = services.config.retry.outline_generation.clone();
    run_with_retries(
        "outline",
        retry.max_retries,
        Duration::from_secs(retry.sleep_seconds),
        |error| {
            let _ = services
                .sessions
                .update_outline_progress(session_id, PhaseProgress::failed(error));
        },
        || {
            let session = load(services, session_id)?;
            let validated_draft = session.current_draft.as_deref().ok_or_else(|| {
                narra_core::NarraError::PreconditionFailed(
                    "no validated draft available".to_string(),
                )
            })?;
            if !session.validated {
                return Err(narra_core::NarraError::PreconditionFailed(
                    "draft must be validated before generating the outline".to_string(),
                ));
            }

            services
                .sessions
                .update_outline_progress(session_id, PhaseProgress::running())?;

            let timeout = services.timeout_ms(services.config.timeouts.generate_outline_ms);
            let output = narra_agents::generate_outline(
                &services.gateway,
                &session.form_data,
                &session.question_answers,
                validated_draft,
                session.current_title.as_deref(),
                timeout,
            )?;

            let updated =
                services
                    .sessions
                    .update_outline(session_id, &output.outline_text, false, None)?;
            services.sessions.update_token_usage(
                session_id,
                Phase::Outline,
                output.usage.input_tokens,
                output.usage.output_tokens,
                &output.usage.model,
            )?;
            services.sessions.update_outline_progress(
                session_id,
                PhaseProgress::completed(json!({
                    "session_id": session_id,
                    "outline_text": output.outline_text,
                    "version": updated.outline_version,
                })),
            )?;
            Ok(())
        },
    );
}

fn load(services: &Services, session_id: &str) -> NarraResult<Session> {
    Ok(services
        .sessions
        .load(session_id)?
        .ok_or_else(|| narra_core::NarraError::NotFound(format!("session {session_id}")))?)
}

/// Runs `attempt` up to `max_attempts` times with a sleep between tries;
/// the final failure is handed to `on_failure` for the progress record.
fn run_with_retries(
    phase: &str,
    max_attempts: u32,
    sleep: Duration,
    on_failure: impl Fn(String),
    attempt: impl Fn() -> NarraResult<()>,
) {
    let attempts = max_attempts.max(1);
    for i in 0..attempts {
        match attempt() {
            Ok(()) => return,
            Err(err) => {
                tracing::warn!(
                    phase,
                    attempt = i + 1,
                    attempts,
                    error = %err,
                    "preparatory phase attempt failed"
                );
                if i + 1 < attempts {
                    std::thread::sleep(sleep);
                } else {
                    on_failure(err.to_string());
                }
            }
        }
    }
}

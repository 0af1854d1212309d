//! The writing task: the per-chapter autoregressive loop with pause on
//! failure, resume from the persisted step, and the completion pipeline
//! (timing bookkeeping, notification, cover, critique).

use chrono::Utc;

use narra_core::errors::{NarraError, NarraResult};
use narra_core::models::progress::WritingProgressPatch;
use narra_core::models::session::{Chapter, Session};
use narra_core::models::tokens::Phase;
use narra_core::traits::NotificationEvent;
use narra_agents::sections::OutlineSection;

use crate::services::Services;
use crate::supervisor::CancelFlag;
use crate::{cover, critique};

/// Entry point for the background writing thread. Setup errors are
/// recorded in the progress document; chapter failures pause inside
/// [`write_book`].
pub fn run_writing_task(
    services: &Services,
    session_id: &str,
    cancel: &CancelFlag,
    resuming: bool,
) {
    match write_book(services, session_id, cancel, resuming) {
        Ok(true) => tracing::info!(session_id, "book generation completed"),
        Ok(false) => tracing::info!(session_id, "book generation paused"),
        Err(err) => {
            tracing::error!(session_id, error = %err, "book generation failed during setup");
            record_setup_failure(services, session_id, &err.to_string());
        }
    }
}

/// Drives the chapter loop. Returns `Ok(true)` on completion, `Ok(false)`
/// when the session was paused (failure or cancellation).
fn write_book(
    services: &Services,
    session_id: &str,
    cancel: &CancelFlag,
    resuming: bool,
) -> NarraResult<bool> {
    let session = load_session(services, session_id)?;
    let validated_draft = session
        .current_draft
        .clone()
        .filter(|_| session.validated)
        .ok_or_else(|| {
            NarraError::PreconditionFailed(
                "draft must be validated before generating the book".to_string(),
            )
        })?;
    let outline_text = session.current_outline.clone().ok_or_else(|| {
        NarraError::PreconditionFailed(
            "outline must be generated before writing starts".to_string(),
        )
    })?;

    let sections = narra_agents::parse_outline_sections(&outline_text)?;
    let total_steps = sections.len() as u32;

    let start_step = if resuming {
        let progress = session.writing_progress.as_ref().ok_or_else(|| {
            NarraError::PreconditionFailed("session has no writing state".to_string())
        })?;
        if !progress.is_paused {
            return Err(NarraError::PreconditionFailed(
                "session is not paused".to_string(),
            ));
        }
        services.sessions.resume_writing(session_id)?;
        progress.current_step.min(total_steps)
    } else {
        0
    };

    // Keep the stored totals honest if the outline changed shape.
    let stored_total = session
        .writing_progress
        .as_ref()
        .map(|p| p.total_steps)
        .unwrap_or(0);
    if stored_total != total_steps {
        services.sessions.update_writing_progress(
            session_id,
            &WritingProgressPatch::step(
                start_step,
                total_steps,
                sections.get(start_step as usize).map(|s| s.title.as_str()),
            ),
        )?;
    }

    let start_time = match session.writing_start_time.filter(|_| resuming) {
        Some(existing) => existing,
        None => {
            let now = Utc::now();
            services
                .sessions
                .update_writing_times(session_id, Some(now), None)?;
            now
        }
    };

    // Autoregressive context: everything persisted before the current
    // step, in order. A partially generated chapter at the pause step was
    // never saved, so it is regenerated from scratch.
    let mut completed: Vec<Chapter> = session
        .book_chapters
        .iter()
        .filter(|ch| ch.section_index < start_step)
        .cloned()
        .collect();

    for (index, section) in sections.iter().enumerate().skip(start_step as usize) {
        let step = index as u32;

        if cancel.load(std::sync::atomic::Ordering::SeqCst) {
            services.sessions.pause_writing(
                session_id,
                step,
                total_steps,
                Some(&section.title),
                "cancelled",
            )?;
            return Ok(false);
        }

        services.sessions.update_writing_progress(
            session_id,
            &WritingProgressPatch::step(step, total_steps, Some(&section.title)),
        )?;
        services.sessions.start_chapter_timing(session_id, None)?;

        match generate_one_chapter(services, &session, &validated_draft, &outline_text, &completed, section)
        {
            Ok((content, usage)) => {
                services.sessions.update_book_chapter(
                    session_id,
                    &section.title,
                    &content,
                    step,
                )?;
                services.sessions.end_chapter_timing(session_id, None)?;
                services.sessions.update_token_usage(
                    session_id,
                    Phase::Chapters,
                    usage.input_tokens,
                    usage.output_tokens,
                    &usage.model,
                )?;
                tracing::info!(
                    session_id,
                    step,
                    total_steps,
                    chars = content.chars().count(),
                    "chapter completed"
                );
                completed.push(Chapter {
                    title: section.title.clone(),
                    content,
                    section_index: step,
                });
            }
            Err(err) => {
                let message =
                    format!("chapter '{}' generation failed: {err}", section.title);
                services.sessions.pause_writing(
                    session_id,
                    step,
                    total_steps,
                    Some(&section.title),
                    &message,
                )?;
                return Ok(false);
            }
        }
    }

    finish_book(services, session_id, total_steps, start_time)?;
    Ok(true)
}

/// One chapter with the configured retry budget; an output below the
/// minimum length counts as a failed attempt.
fn generate_one_chapter(
    services: &Services,
    session: &Session,
    validated_draft: &str,
    outline_text: &str,
    completed: &[Chapter],
    section: &OutlineSection,
) -> NarraResult<(String, narra_core::models::tokens::CallUsage)> {
    let retry = &services.config.retry.chapter_generation;
    let attempts = retry.max_retries.max(1);
    let timeout = services.timeout_ms(services.config.timeouts.chapter_generation_ms);

    let mut last_error = String::new();
    for attempt in 0..attempts {
        match narra_agents::generate_chapter(
            &services.gateway,
            &session.form_data,
            &session.question_answers,
            validated_draft,
            session.current_title.as_deref(),
            outline_text,
            completed,
            section,
            timeout,
        ) {
            Ok(output) if output.content.chars().count() >= retry.min_chapter_length => {
                return Ok((output.content, output.usage));
            }
            Ok(output) => {
                last_error = format!(
                    "chapter too short ({} chars, minimum {})",
                    output.content.chars().count(),
                    retry.min_chapter_length
                );
                tracing::warn!(
                    section = %section.title,
                    attempt = attempt + 1,
                    attempts,
                    "{last_error}"
                );
            }
            Err(err) => {
                last_error = err.to_string();
                tracing::warn!(
                    section = %section.title,
                    attempt = attempt + 1,
                    attempts,
                    error = %last_error,
                    "chapter attempt failed"
                );
            }
        }
    }
    Err(NarraError::Validation(last_error))
}

fn finish_book(
    services: &Services,
    session_id: &str,
    total_steps: u32,
    start_time: chrono::DateTime<Utc>,
) -> NarraResult<()> {
    services.sessions.update_writing_progress(
        session_id,
        &WritingProgressPatch {
            current_step: total_steps,
            total_steps,
            current_section_name: None,
            is_complete: true,
            is_paused: false,
            error: None,
            completed_chapters_count: Some(total_steps),
            ..Default::default()
        },
    )?;

    let end_time = Utc::now();
    services
        .sessions
        .update_writing_times(session_id, None, Some(end_time))?;
    let writing_time_minutes = (end_time - start_time).num_milliseconds() as f64 / 60_000.0;
    services
        .sessions
        .set_writing_time_minutes(session_id, writing_time_minutes)?;

    if let Ok(Some(session)) = services.sessions.load(session_id) {
        let book_title = session.current_title.as_deref().unwrap_or("Il tuo libro");
        services.notify(
            session.user_id.as_deref(),
            NotificationEvent::book_completed(session_id, book_title),
        );
    }

    // Cover first, then critique: the rendered PDF should carry the
    // cover when one could be produced. Both stages own their failures.
    cover::run_cover_stage(services, session_id);
    critique::run_critique_stage(services, session_id);
    Ok(())
}

fn load_session(services: &Services, session_id: &str) -> NarraResult<Session> {
    services
        .sessions
        .load(session_id)?
        .ok_or_else(|| NarraError::NotFound(format!("session {session_id}")))
}

/// Setup failures (bad outline, missing draft) are not pauses: they land
/// in the progress error field with the known total preserved.
fn record_setup_failure(services: &Services, session_id: &str, message: &str) {
    let existing_total = services
        .sessions
        .load(session_id)
        .ok()
        .flatten()
        .and_then(|s| s.writing_progress.map(|p| p.total_steps))
        .unwrap_or(0);
    let patch = WritingProgressPatch {
        current_step: 0,
        total_steps: existing_total.max(1),
        current_section_name: None,
        is_complete: false,
        is_paused: false,
        error: Some(message.to_string()),
        ..Default::default()
    };
    if let Err(err) = services.sessions.update_writing_progress(session_id, &patch) {
        tracing::error!(session_id, error = %err, "failed to record setup failure");
    }
}

//! The engine façade: the operations a router calls. Owns the task
//! supervisor and hands background work to named threads.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use narra_core::catalog;
use narra_core::errors::{NarraError, NarraResult};
use narra_core::models::session::{CritiqueStatus, Session, SessionStatus};

use crate::progress::{residual_estimate, Confidence};
use crate::services::Services;
use crate::supervisor::TaskSupervisor;
use crate::{prep, writing};

/// Progress snapshot returned to pollers, with the residual-time
/// estimate attached while the book is in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookProgress {
    pub session_id: String,
    pub current_step: u32,
    pub total_steps: u32,
    pub current_section_name: Option<String>,
    pub completed_chapters: u32,
    pub is_complete: bool,
    pub is_paused: bool,
    pub error: Option<String>,
    pub estimated_time_minutes: Option<f64>,
    pub estimated_time_confidence: Option<Confidence>,
    pub critique_status: Option<CritiqueStatus>,
    pub critique_error: Option<String>,
}

pub struct Engine {
    services: Arc<Services>,
    supervisor: Arc<TaskSupervisor>,
}

impl Engine {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            supervisor: Arc::new(TaskSupervisor::new()),
        }
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Starts the questions job for a session.
    pub fn start_questions(&self, session_id: &str, caller: Option<&str>) -> NarraResult<()> {
        self.services.sessions.get(session_id, caller)?;
        self.spawn_prep(session_id, "questions", {
            let services = self.services.clone();
            let sid = session_id.to_string();
            move || prep::run_questions_job(&services, &sid)
        })
    }

    /// Starts the draft job; `user_feedback` turns it into a revision of
    /// the current draft.
    pub fn start_draft(
        &self,
        session_id: &str,
        caller: Option<&str>,
        user_feedback: Option<String>,
    ) -> NarraResult<()> {
        self.services.sessions.get(session_id, caller)?;
        self.spawn_prep(session_id, "draft", {
            let services = self.services.clone();
            let sid = session_id.to_string();
            move || prep::run_draft_job(&services, &sid, user_feedback)
        })
    }

    /// Starts the outline job (requires a validated draft).
    pub fn start_outline(&self, session_id: &str, caller: Option<&str>) -> NarraResult<()> {
        let session = self.services.sessions.get(session_id, caller)?;
        if session.current_draft.is_none() || !session.validated {
            return Err(NarraError::PreconditionFailed(
                "draft must be validated before generating the outline".to_string(),
            ));
        }
        self.spawn_prep(session_id, "outline", {
            let services = self.services.clone();
            let sid = session_id.to_string();
            move || prep::run_outline_job(&services, &sid)
        })
    }

    /// Gate + credit + progress init + task spawn for book writing.
    /// Consumes exactly one credit, at start, never per phase.
    pub fn start_generation(&self, session_id: &str, caller: Option<&str>) -> NarraResult<()> {
        // Reject before any side effect: a second start must not burn a
        // credit or touch the running task's progress.
        if self.supervisor.is_running(&writing_key(session_id)) {
            return Err(NarraError::PreconditionFailed(
                "a generation task is already running for this session".to_string(),
            ));
        }
        let session = self.services.sessions.get(session_id, caller)?;

        if session.current_draft.is_none() || !session.validated {
            return Err(NarraError::PreconditionFailed(
                "draft must be validated before generating the book".to_string(),
            ));
        }
        let outline = session.current_outline.as_deref().ok_or_else(|| {
            NarraError::PreconditionFailed(
                "outline must be generated before writing starts".to_string(),
            )
        })?;
        if session.status() == SessionStatus::Complete {
            return Err(NarraError::PreconditionFailed(
                "session is already complete".to_string(),
            ));
        }

        // Validate the outline shape before spending a credit.
        let sections = narra_agents::parse_outline_sections(outline)?;

        if let Some(user_id) = &session.user_id {
            let mode = catalog::mode_of(&session.form_data.llm_model);
            self.services.ledger.consume(user_id, mode)?;
        } else {
            tracing::warn!(session_id, "unowned session: no credit consumed");
        }

        self.services.sessions.update_writing_progress(
            session_id,
            &narra_core::models::progress::WritingProgressPatch::step(
                0,
                sections.len() as u32,
                sections.first().map(|s| s.title.as_str()),
            ),
        )?;

        self.spawn_writing(session_id, false)
    }

    /// Resumes a paused session at its persisted step.
    pub fn resume_generation(&self, session_id: &str, caller: Option<&str>) -> NarraResult<()> {
        if self.supervisor.is_running(&writing_key(session_id)) {
            return Err(NarraError::PreconditionFailed(
                "a generation task is already running for this session".to_string(),
            ));
        }
        let session = self.services.sessions.get(session_id, caller)?;
        let progress = session.writing_progress.as_ref().ok_or_else(|| {
            NarraError::PreconditionFailed("session has no writing state".to_string())
        })?;
        if !progress.is_paused {
            return Err(NarraError::PreconditionFailed(
                "session is not paused".to_string(),
            ));
        }
        self.spawn_writing(session_id, true)
    }

    /// Re-runs the critique pipeline for a finished book (e.g. after a
    /// failed attempt or a critic-model change).
    pub fn regenerate_critique(&self, session_id: &str, caller: Option<&str>) -> NarraResult<()> {
        let session = self.services.sessions.get(session_id, caller)?;
        if session.status() != SessionStatus::Complete {
            return Err(NarraError::PreconditionFailed(
                "critique requires a completed book".to_string(),
            ));
        }
        let services = self.services.clone();
        let sid = session_id.to_string();
        let thread_name = format!("narra-critic-{}", short_id(session_id));
        self.supervisor
            .spawn(&format!("{session_id}/critique"), &thread_name, move |_| {
                crate::critique::run_critique_stage(&services, &sid)
            })
    }

    /// Re-runs cover generation for a finished book.
    pub fn regenerate_cover(&self, session_id: &str, caller: Option<&str>) -> NarraResult<()> {
        let session = self.services.sessions.get(session_id, caller)?;
        if session.status() != SessionStatus::Complete {
            return Err(NarraError::PreconditionFailed(
                "cover regeneration requires a completed book".to_string(),
            ));
        }
        let services = self.services.clone();
        let sid = session_id.to_string();
        let thread_name = format!("narra-cover-{}", short_id(session_id));
        self.supervisor
            .spawn(&format!("{session_id}/cover"), &thread_name, move |_| {
                crate::cover::run_cover_stage(&services, &sid)
            })
    }

    /// Cooperative cancel; takes effect at the next chapter boundary.
    pub fn cancel_generation(&self, session_id: &str) -> bool {
        self.supervisor.cancel(&writing_key(session_id))
    }

    pub fn is_writing(&self, session_id: &str) -> bool {
        self.supervisor.is_running(&writing_key(session_id))
    }

    /// Blocks until the writing task exits. For tests and shutdown.
    pub fn wait_for_writing(&self, session_id: &str) {
        self.supervisor.join(&writing_key(session_id));
    }

    /// Blocks until a preparatory job exits. For tests and shutdown.
    pub fn wait_for_prep(&self, session_id: &str, phase: &str) {
        self.supervisor.join(&format!("{session_id}/{phase}"));
    }

    /// Progress poll: the stored progress document plus the residual
    /// estimate, with pathological stored values coerced instead of
    /// failing the poll.
    pub fn book_progress(&self, session_id: &str, caller: Option<&str>) -> NarraResult<BookProgress> {
        let session = self.services.sessions.get(session_id, caller)?;
        Ok(build_progress(&self.services, &session))
    }

    fn spawn_prep(
        &self,
        session_id: &str,
        phase: &str,
        job: impl FnOnce() + Send + 'static,
    ) -> NarraResult<()> {
        let key = format!("{session_id}/{phase}");
        let thread_name = format!("narra-{phase}-{}", short_id(session_id));
        self.supervisor.spawn(&key, &thread_name, move |_cancel| job())
    }

    fn spawn_writing(&self, session_id: &str, resuming: bool) -> NarraResult<()> {
        let services = self.services.clone();
        let sid = session_id.to_string();
        let thread_name = format!("narra-writer-{}", short_id(session_id));
        self.supervisor
            .spawn(&writing_key(session_id), &thread_name, move |cancel| {
                writing::run_writing_task(&services, &sid, &cancel, resuming)
            })
    }
}

fn writing_key(session_id: &str) -> String {
    format!("{session_id}/writing")
}

fn short_id(session_id: &str) -> &str {
    &session_id[..session_id.len().min(8)]
}

fn build_progress(services: &Services, session: &Session) -> BookProgress {
    let progress = session.writing_progress.clone().unwrap_or_default();
    let completed_chapters = progress
        .completed_chapters_count
        .unwrap_or_else(|| session.book_chapters.len() as u32)
        .max(session.book_chapters.len() as u32);

    let effective_total = if progress.total_steps > 0 {
        progress.total_steps
    } else {
        // Stored total missing: recover it from the outline when
        // possible, else coerce to a single step.
        session
            .current_outline
            .as_deref()
            .and_then(|o| narra_agents::parse_outline_sections(o).ok())
            .map(|s| s.len() as u32)
            .unwrap_or(1)
    };

    let (estimated_time_minutes, estimated_time_confidence) = if progress.is_complete {
        (None, None)
    } else {
        let (minutes, confidence) = residual_estimate(
            &session.form_data.llm_model,
            progress.current_step,
            effective_total,
            &session.chapter_timings,
            &services.config.time_estimation,
        );
        (Some(minutes), Some(confidence))
    };

    BookProgress {
        session_id: session.session_id.clone(),
        current_step: progress.current_step,
        total_steps: effective_total,
        current_section_name: progress.current_section_name.clone(),
        completed_chapters,
        is_complete: progress.is_complete,
        is_paused: progress.is_paused,
        error: progress.error.clone(),
        estimated_time_minutes,
        estimated_time_confidence,
        critique_status: effective_critique_status(session),
        critique_error: session.critique_error.clone(),
    }
}

/// Sessions predating the status field report a coherent value: a stored
/// critique means completed; a finished book without one means pending.
fn effective_critique_status(session: &Session) -> Option<CritiqueStatus> {
    if session.critique_status.is_some() {
        return session.critique_status;
    }
    if session.literary_critique.is_some() {
        return Some(CritiqueStatus::Completed);
    }
    if session.status() == SessionStatus::Complete {
        return Some(CritiqueStatus::Pending);
    }
    None
}

//! Field-scoped session mutators. Each one loads the document, touches
//! only the fields it is authorized to set, and persists; sibling fields
//! written by concurrent phases survive.

use chrono::{DateTime, Utc};

use narra_core::errors::{StoreError, StoreResult};
use narra_core::models::form::Question;
use narra_core::models::progress::{PhaseProgress, WritingProgress, WritingProgressPatch};
use narra_core::models::session::{Critique, CritiqueStatus, DraftRevision, Session};
use narra_core::models::tokens::Phase;

use super::SessionStore;

impl SessionStore {
    /// Appends a draft revision. Without an explicit version the counter
    /// bumps; with one, the counter is set to it.
    pub fn update_draft(
        &self,
        session_id: &str,
        draft_text: &str,
        version: Option<u32>,
        title: Option<&str>,
    ) -> StoreResult<Session> {
        self.mutate(session_id, |session| {
            let version = match version {
                Some(v) => {
                    session.current_version = v;
                    v
                }
                None => {
                    session.current_version += 1;
                    session.current_version
                }
            };
            session.current_draft = Some(draft_text.to_string());
            if let Some(title) = title {
                session.current_title = Some(title.to_string());
            }
            session.draft_history.push(DraftRevision {
                version,
                text: draft_text.to_string(),
                title: title.map(str::to_string),
            });
            Ok(session.clone())
        })
    }

    /// Marks the current draft as validated.
    pub fn validate(&self, session_id: &str) -> StoreResult<Session> {
        self.mutate(session_id, |session| {
            session.validated = true;
            Ok(session.clone())
        })
    }

    pub fn save_generated_questions(
        &self,
        session_id: &str,
        questions: Vec<Question>,
    ) -> StoreResult<Session> {
        self.mutate(session_id, |session| {
            session.generated_questions = Some(questions);
            Ok(session.clone())
        })
    }

    /// Stores the answers collected from the user.
    pub fn save_question_answers(
        &self,
        session_id: &str,
        answers: Vec<narra_core::models::form::QuestionAnswer>,
    ) -> StoreResult<Session> {
        self.mutate(session_id, |session| {
            session.question_answers = answers;
            Ok(session.clone())
        })
    }

    /// Rewrites the outline and bumps its version. Rejected with
    /// `OutlineFrozen` once writing has started and is not complete,
    /// unless the caller opts in with `allow_if_writing`.
    pub fn update_outline(
        &self,
        session_id: &str,
        outline_text: &str,
        allow_if_writing: bool,
        version: Option<u32>,
    ) -> StoreResult<Session> {
        self.mutate(session_id, |session| {
            if !allow_if_writing {
                if let Some(progress) = &session.writing_progress {
                    if !progress.is_complete {
                        return Err(StoreError::OutlineFrozen {
                            current_step: progress.current_step,
                            total_steps: progress.total_steps,
                        });
                    }
                }
            }
            session.current_outline = Some(outline_text.to_string());
            match version {
                Some(v) => session.outline_version = v,
                None => session.outline_version += 1,
            }
            Ok(session.clone())
        })
    }

    /// Merge-safe progress update: the patch's core fields are written,
    /// its optional fields only when present, and anything else already
    /// in the subdocument is preserved.
    pub fn update_writing_progress(
        &self,
        session_id: &str,
        patch: &WritingProgressPatch,
    ) -> StoreResult<Session> {
        self.mutate(session_id, |session| {
            let mut progress = session.writing_progress.take().unwrap_or_default();
            progress.apply(patch);
            session.writing_progress = Some(progress);
            Ok(session.clone())
        })
    }

    pub fn update_questions_progress(
        &self,
        session_id: &str,
        progress: PhaseProgress,
    ) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            session.questions_progress = Some(progress);
            Ok(())
        })
    }

    pub fn update_draft_progress(
        &self,
        session_id: &str,
        progress: PhaseProgress,
    ) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            session.draft_progress = Some(progress);
            Ok(())
        })
    }

    pub fn update_outline_progress(
        &self,
        session_id: &str,
        progress: PhaseProgress,
    ) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            session.outline_progress = Some(progress);
            Ok(())
        })
    }

    /// Accumulates token usage for a phase and the grand total.
    pub fn update_token_usage(
        &self,
        session_id: &str,
        phase: Phase,
        input_tokens: u64,
        output_tokens: u64,
        model: &str,
    ) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            session
                .token_usage
                .record(phase, input_tokens, output_tokens, model);
            Ok(())
        })
    }

    /// Writes only `estimated_cost` inside writing_progress.
    pub fn set_estimated_cost(&self, session_id: &str, estimated_cost: f64) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            let progress = session
                .writing_progress
                .get_or_insert_with(WritingProgress::default);
            progress.estimated_cost = Some(estimated_cost);
            Ok(())
        })
    }

    /// Writes only `writing_time_minutes` inside writing_progress.
    pub fn set_writing_time_minutes(&self, session_id: &str, minutes: f64) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            let progress = session
                .writing_progress
                .get_or_insert_with(WritingProgress::default);
            progress.writing_time_minutes = Some(minutes);
            Ok(())
        })
    }

    /// Stores the post-hoc token-based cost.
    pub fn set_real_cost(&self, session_id: &str, real_cost_eur: f64) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            session.real_cost_eur = Some(real_cost_eur);
            Ok(())
        })
    }

    /// Pauses the writing phase after a chapter-level failure.
    pub fn pause_writing(
        &self,
        session_id: &str,
        current_step: u32,
        total_steps: u32,
        current_section_name: Option<&str>,
        error_msg: &str,
    ) -> StoreResult<Session> {
        self.update_writing_progress(
            session_id,
            &WritingProgressPatch {
                current_step,
                total_steps,
                current_section_name: current_section_name.map(str::to_string),
                is_complete: false,
                is_paused: true,
                error: Some(error_msg.to_string()),
                ..Default::default()
            },
        )
    }

    /// Clears the pause flag and error, keeping every other progress
    /// field.
    pub fn resume_writing(&self, session_id: &str) -> StoreResult<Session> {
        self.mutate(session_id, |session| {
            let progress = session.writing_progress.as_mut().ok_or_else(|| {
                StoreError::Sqlite {
                    message: format!("session {session_id} has no writing state"),
                }
            })?;
            progress.is_paused = false;
            progress.error = None;
            progress.is_complete = false;
            Ok(session.clone())
        })
    }

    /// Upserts a completed chapter by section index.
    pub fn update_book_chapter(
        &self,
        session_id: &str,
        chapter_title: &str,
        chapter_content: &str,
        section_index: u32,
    ) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            session.upsert_chapter(
                chapter_title.to_string(),
                chapter_content.to_string(),
                section_index,
            );
            Ok(())
        })
    }

    pub fn update_cover_image_path(&self, session_id: &str, path: &str) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            session.cover_image_path = Some(path.to_string());
            Ok(())
        })
    }

    /// Stores a finished critique; implies status `completed`.
    pub fn update_critique(&self, session_id: &str, critique: Critique) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            session.literary_critique = Some(critique);
            session.critique_status = Some(CritiqueStatus::Completed);
            session.critique_error = None;
            Ok(())
        })
    }

    /// Status-only transition. A failed status keeps any critique already
    /// present (useful for history and debugging).
    pub fn update_critique_status(
        &self,
        session_id: &str,
        status: CritiqueStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            session.critique_status = Some(status);
            session.critique_error = error.map(str::to_string);
            Ok(())
        })
    }

    pub fn update_writing_times(
        &self,
        session_id: &str,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            if let Some(start) = start_time {
                session.writing_start_time = Some(start);
            }
            if let Some(end) = end_time {
                session.writing_end_time = Some(end);
            }
            Ok(())
        })
    }

    pub fn start_chapter_timing(
        &self,
        session_id: &str,
        start_time: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            session.chapter_start_time = Some(start_time.unwrap_or_else(Self::now));
            Ok(())
        })
    }

    /// Appends the elapsed chapter duration and clears the start marker.
    /// No-op when no chapter timing is in flight.
    pub fn end_chapter_timing(
        &self,
        session_id: &str,
        end_time: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            if let Some(start) = session.chapter_start_time.take() {
                let end = end_time.unwrap_or_else(Self::now);
                let duration_seconds = (end - start).num_milliseconds() as f64 / 1000.0;
                session.chapter_timings.push(duration_seconds);
            }
            Ok(())
        })
    }
}

//! The session aggregate: one document per book project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::form::{Question, QuestionAnswer, SubmissionForm};
use super::progress::{PhaseProgress, WritingProgress};
use super::tokens::TokenUsage;

/// One saved draft revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRevision {
    pub version: u32,
    pub text: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// A completed chapter. `section_index` is the primary key within a
/// session: inserting at an existing index replaces the chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
    pub section_index: u32,
}

/// The AI critique of the finished book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Critique {
    /// Score on a 0..=10 scale.
    pub score: f64,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CritiqueStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Status labels derived from the stored fields. There is no status
/// column: the derivation is pure, so "what is written" and "what status
/// says" cannot diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Draft,
    Outline,
    Writing,
    Paused,
    Complete,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Draft => "draft",
            SessionStatus::Outline => "outline",
            SessionStatus::Writing => "writing",
            SessionStatus::Paused => "paused",
            SessionStatus::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(SessionStatus::Draft),
            "outline" => Some(SessionStatus::Outline),
            "writing" => Some(SessionStatus::Writing),
            "paused" => Some(SessionStatus::Paused),
            "complete" => Some(SessionStatus::Complete),
            _ => None,
        }
    }
}

/// The aggregate root carrying a novel from form submission to finished
/// artifacts. Owns all its subdocuments; mutation goes through the
/// session store's field-scoped operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub session_id: String,
    pub user_id: Option<String>,
    pub form_data: SubmissionForm,
    pub question_answers: Vec<QuestionAnswer>,
    pub generated_questions: Option<Vec<Question>>,

    pub draft_history: Vec<DraftRevision>,
    pub current_draft: Option<String>,
    pub current_title: Option<String>,
    pub current_version: u32,
    pub validated: bool,

    pub current_outline: Option<String>,
    pub outline_version: u32,

    pub book_chapters: Vec<Chapter>,
    pub writing_progress: Option<WritingProgress>,
    pub cover_image_path: Option<String>,

    pub literary_critique: Option<Critique>,
    pub critique_status: Option<CritiqueStatus>,
    pub critique_error: Option<String>,

    pub writing_start_time: Option<DateTime<Utc>>,
    pub writing_end_time: Option<DateTime<Utc>>,
    pub chapter_start_time: Option<DateTime<Utc>>,
    pub chapter_timings: Vec<f64>,

    pub questions_progress: Option<PhaseProgress>,
    pub draft_progress: Option<PhaseProgress>,
    pub outline_progress: Option<PhaseProgress>,

    pub token_usage: TokenUsage,
    pub real_cost_eur: Option<f64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            session_id: String::new(),
            user_id: None,
            form_data: SubmissionForm::default(),
            question_answers: Vec::new(),
            generated_questions: None,
            draft_history: Vec::new(),
            current_draft: None,
            current_title: None,
            current_version: 0,
            validated: false,
            current_outline: None,
            outline_version: 0,
            book_chapters: Vec::new(),
            writing_progress: None,
            cover_image_path: None,
            literary_critique: None,
            critique_status: None,
            critique_error: None,
            writing_start_time: None,
            writing_end_time: None,
            chapter_start_time: None,
            chapter_timings: Vec::new(),
            questions_progress: None,
            draft_progress: None,
            outline_progress: None,
            token_usage: TokenUsage::default(),
            real_cost_eur: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Session {
    /// Creates a fresh session for a form submission.
    pub fn new(
        session_id: impl Into<String>,
        form_data: SubmissionForm,
        question_answers: Vec<QuestionAnswer>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id,
            form_data,
            question_answers,
            ..Self::default()
        }
    }

    /// Derives the current status from the stored fields.
    pub fn status(&self) -> SessionStatus {
        match &self.writing_progress {
            Some(progress) if progress.is_complete => SessionStatus::Complete,
            Some(progress) if progress.is_paused => SessionStatus::Paused,
            Some(_) => SessionStatus::Writing,
            None if self.current_outline.is_some() => SessionStatus::Outline,
            None => SessionStatus::Draft,
        }
    }

    /// Upserts a chapter by `section_index` and keeps the list sorted.
    pub fn upsert_chapter(&mut self, title: String, content: String, section_index: u32) {
        self.book_chapters
            .retain(|ch| ch.section_index != section_index);
        self.book_chapters.push(Chapter {
            title,
            content,
            section_index,
        });
        self.book_chapters.sort_by_key(|ch| ch.section_index);
    }

    /// True when writing has started and is not yet finished: the window
    /// in which the outline is frozen.
    pub fn writing_in_progress(&self) -> bool {
        self.writing_progress
            .as_ref()
            .is_some_and(|p| !p.is_complete)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::progress::WritingProgressPatch;

    fn session_with_progress(is_complete: bool, is_paused: bool) -> Session {
        let mut session = Session::new("s1", SubmissionForm::default(), vec![], None);
        let mut progress = WritingProgress::default();
        progress.apply(&WritingProgressPatch {
            current_step: 1,
            total_steps: 3,
            is_complete,
            is_paused,
            ..Default::default()
        });
        session.writing_progress = Some(progress);
        session
    }

    #[test]
    fn status_derivation_is_total() {
        let bare = Session::new("s1", SubmissionForm::default(), vec![], None);
        assert_eq!(bare.status(), SessionStatus::Draft);

        let mut outlined = Session::new("s2", SubmissionForm::default(), vec![], None);
        outlined.current_outline = Some("## Capitolo 1".to_string());
        assert_eq!(outlined.status(), SessionStatus::Outline);

        assert_eq!(
            session_with_progress(false, false).status(),
            SessionStatus::Writing
        );
        assert_eq!(
            session_with_progress(false, true).status(),
            SessionStatus::Paused
        );
        assert_eq!(
            session_with_progress(true, false).status(),
            SessionStatus::Complete
        );
    }

    #[test]
    fn upsert_chapter_replaces_and_sorts() {
        let mut session = Session::new("s1", SubmissionForm::default(), vec![], None);
        session.upsert_chapter("Due".into(), "b".into(), 1);
        session.upsert_chapter("Uno".into(), "a".into(), 0);
        session.upsert_chapter("Due rivisto".into(), "b2".into(), 1);

        let indices: Vec<u32> = session.book_chapters.iter().map(|c| c.section_index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(session.book_chapters[1].title, "Due rivisto");
    }
}

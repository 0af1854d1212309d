//! The user submission form and the preliminary question types.

use serde::{Deserialize, Serialize};

/// The form a user fills to start a book project.
/// `llm_model` and `plot` are the only required fields; everything else
/// refines the narrative brief.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SubmissionForm {
    pub llm_model: String,
    pub plot: String,
    pub genre: Option<String>,
    pub subgenre: Option<String>,
    pub target_audience: Option<String>,
    pub theme: Option<String>,
    pub protagonist: Option<String>,
    pub protagonist_archetype: Option<String>,
    pub character_arc: Option<String>,
    pub point_of_view: Option<String>,
    pub narrative_voice: Option<String>,
    pub style: Option<String>,
    pub temporal_structure: Option<String>,
    pub pace: Option<String>,
    pub realism: Option<String>,
    pub ambiguity: Option<String>,
    pub intentionality: Option<String>,
    /// Reference author whose style the book should echo.
    pub author: Option<String>,
    /// The human author name printed on the cover.
    pub user_name: Option<String>,
    pub cover_style: Option<String>,
    /// Explicit temperature override for the writer agent.
    pub temperature: Option<f64>,
}

impl SubmissionForm {
    /// Validates the required fields.
    pub fn validate(&self) -> Result<(), String> {
        if self.llm_model.trim().is_empty() {
            return Err("llm_model is required".to_string());
        }
        if self.plot.trim().is_empty() {
            return Err("plot is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    MultipleChoice,
}

/// A preliminary question generated from the form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// A user's answer to a preliminary question. `answer = None` means the
/// question was skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question_id: String,
    #[serde(default)]
    pub answer: Option<String>,
}

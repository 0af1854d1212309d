//! Questions runner: form → up to 10 preliminary questions with stable
//! ids.

use std::time::Duration;

use narra_core::errors::NarraResult;
use narra_core::models::form::{Question, QuestionKind, SubmissionForm};
use narra_core::models::tokens::CallUsage;
use narra_llm::{LlmGateway, TextRequest};

use crate::{context, prompts};

const QUESTIONS_MODEL: &str = "gemini-3-pro-preview";
const MAX_QUESTIONS: usize = 10;

pub struct QuestionsOutput {
    pub questions: Vec<Question>,
    pub usage: CallUsage,
}

pub fn generate_questions(
    gateway: &LlmGateway,
    form: &SubmissionForm,
    timeout: Duration,
) -> NarraResult<QuestionsOutput> {
    let user_prompt = format!(
        "Scheda del romanzo:\n\n{}\n\nGenera le domande preliminari in JSON.",
        context::format_form_block(form)
    );
    let request = TextRequest {
        temperature: gateway.temperature_for("question_generator", QUESTIONS_MODEL),
        response_mime_type: Some("application/json".to_string()),
        timeout,
        ..TextRequest::new(prompts::QUESTIONS_SYSTEM, user_prompt, QUESTIONS_MODEL)
    };
    let response = gateway.generate_text(&request)?;
    let questions = parse_questions(&response.text);
    Ok(QuestionsOutput {
        questions,
        usage: response.usage,
    })
}

/// Parses the model's question list. Primary path is a JSON array
/// (possibly fenced); the fallback turns non-empty lines into text
/// questions so a sloppy reply still yields something usable.
pub fn parse_questions(raw: &str) -> Vec<Question> {
    if let Some(parsed) = parse_json_questions(raw) {
        return parsed;
    }

    raw.lines()
        .map(str::trim)
        .filter(|line| line.ends_with('?'))
        .take(MAX_QUESTIONS)
        .enumerate()
        .map(|(i, line)| Question {
            id: format!("q{}", i + 1),
            text: line.trim_start_matches(['-', '*', ' ']).to_string(),
            kind: QuestionKind::Text,
            options: None,
        })
        .collect()
}

fn parse_json_questions(raw: &str) -> Option<Vec<Question>> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end <= start {
        return None;
    }
    let items: Vec<serde_json::Value> = serde_json::from_str(&raw[start..=end]).ok()?;

    let mut questions = Vec::new();
    for (i, item) in items.into_iter().take(MAX_QUESTIONS).enumerate() {
        let text = item.get("text")?.as_str()?.to_string();
        let kind = match item.get("type").and_then(|v| v.as_str()) {
            Some("multiple_choice") => QuestionKind::MultipleChoice,
            _ => QuestionKind::Text,
        };
        let options = item.get("options").and_then(|v| v.as_array()).map(|arr| {
            arr.iter()
                .filter_map(|o| o.as_str().map(str::to_string))
                .collect::<Vec<_>>()
        });
        let id = item
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("q{}", i + 1));
        questions.push(Question {
            id,
            text,
            kind,
            options: options.filter(|o| !o.is_empty()),
        });
    }
    if questions.is_empty() {
        None
    } else {
        Some(questions)
    }
}

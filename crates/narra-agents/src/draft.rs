//! Draft runner: form + answers (+ previous draft and user feedback on
//! revision) → titled extended plot.

use std::time::Duration;

use narra_core::errors::NarraResult;
use narra_core::models::form::{QuestionAnswer, SubmissionForm};
use narra_core::models::tokens::CallUsage;
use narra_llm::{LlmGateway, TextRequest};

use crate::{context, prompts};

// The draft always runs on the pro model regardless of the selected
// mode: it is one call and anchors everything downstream.
const DRAFT_MODEL: &str = "gemini-3-pro-preview";

const DEFAULT_TITLE: &str = "Titolo non specificato";

pub struct DraftOutput {
    pub title: String,
    pub text: String,
    pub usage: CallUsage,
}

pub fn generate_draft(
    gateway: &LlmGateway,
    form: &SubmissionForm,
    answers: &[QuestionAnswer],
    previous_draft: Option<&str>,
    user_feedback: Option<&str>,
    timeout: Duration,
) -> NarraResult<DraftOutput> {
    let mut user_prompt = format!(
        "Scheda del romanzo:\n\n{}\n\nRisposte alle domande preliminari:\n{}",
        context::format_form_block(form),
        context::format_answers_block(answers),
    );
    if let Some(previous) = previous_draft {
        user_prompt.push_str(&format!("\n\n## BOZZA PRECEDENTE\n{previous}"));
    }
    if let Some(feedback) = user_feedback {
        user_prompt.push_str(&format!(
            "\n\n## RICHIESTE DI MODIFICA DELL'UTENTE\n{feedback}\n\nRiscrivi la trama \
             integrando le richieste, mantenendo il formato TITOLO:/TRAMA:."
        ));
    }

    let request = TextRequest {
        temperature: gateway.temperature_for("draft_generator", DRAFT_MODEL),
        timeout,
        ..TextRequest::new(prompts::DRAFT_SYSTEM, user_prompt, DRAFT_MODEL)
    };
    let response = gateway.generate_text(&request)?;
    let (title, text) = parse_draft_response(&response.text);
    Ok(DraftOutput {
        title,
        text,
        usage: response.usage,
    })
}

/// Splits the model reply into title and plot. Primary format is the
/// `TITOLO:` / `TRAMA:` header pair; fallbacks are the first Markdown H1
/// for the title and the whole reply for the text.
pub fn parse_draft_response(raw: &str) -> (String, String) {
    let mut title: Option<String> = None;
    let mut found_trama = false;
    let mut draft_text = String::new();

    for line in raw.lines() {
        let stripped = line.trim();
        let upper = stripped.to_uppercase();

        if title.is_none() && upper.starts_with("TITOLO:") {
            let value = stripped[7..].trim();
            if !value.is_empty() {
                title = Some(value.to_string());
            }
            continue;
        }
        if !found_trama && (upper.starts_with("TRAMA:") || upper == "TRAMA") {
            found_trama = true;
            if upper.starts_with("TRAMA:") {
                let rest = stripped[6..].trim();
                if !rest.is_empty() {
                    draft_text.push_str(rest);
                    draft_text.push('\n');
                }
            }
            continue;
        }
        if found_trama {
            draft_text.push_str(line);
            draft_text.push('\n');
        }
    }

    if title.is_none() {
        title = raw
            .lines()
            .find(|l| l.trim().starts_with("# "))
            .map(|l| l.trim()[2..].trim().to_string());
    }
    if !found_trama {
        draft_text = raw.to_string();
    }

    (
        title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        draft_text.trim().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_titolo_trama_headers() {
        let raw = "TITOLO: La villa sul mare\nTRAMA:\nAnna arriva in Liguria.\nTrova un diario.";
        let (title, text) = parse_draft_response(raw);
        assert_eq!(title, "La villa sul mare");
        assert_eq!(text, "Anna arriva in Liguria.\nTrova un diario.");
    }

    #[test]
    fn inline_trama_text_is_kept() {
        let raw = "TITOLO: X\nTRAMA: comincia subito qui.\ne continua.";
        let (_, text) = parse_draft_response(raw);
        assert!(text.starts_with("comincia subito qui."));
        assert!(text.contains("e continua."));
    }

    #[test]
    fn falls_back_to_markdown_h1() {
        let raw = "# Il Faro\n\nUna storia di mare e nebbia.";
        let (title, text) = parse_draft_response(raw);
        assert_eq!(title, "Il Faro");
        assert!(text.contains("storia di mare"));
    }

    #[test]
    fn falls_back_to_default_title() {
        let raw = "Solo una trama senza intestazioni.";
        let (title, text) = parse_draft_response(raw);
        assert_eq!(title, "Titolo non specificato");
        assert_eq!(text, raw);
    }
}

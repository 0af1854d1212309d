//! Chapter runner: the autoregressive loop's single step. Receives every
//! previously written chapter verbatim and returns prose only.

use std::time::Duration;

use narra_core::catalog;
use narra_core::errors::NarraResult;
use narra_core::models::form::{QuestionAnswer, SubmissionForm};
use narra_core::models::session::Chapter;
use narra_core::models::tokens::CallUsage;
use narra_llm::{LlmGateway, TextRequest};

use crate::sections::OutlineSection;
use crate::{context, prompts};

const MAX_CHAPTER_OUTPUT_TOKENS: u32 = 8192;

pub struct ChapterOutput {
    pub content: String,
    pub usage: CallUsage,
}

#[allow(clippy::too_many_arguments)]
pub fn generate_chapter(
    gateway: &LlmGateway,
    form: &SubmissionForm,
    answers: &[QuestionAnswer],
    validated_draft: &str,
    draft_title: Option<&str>,
    outline_text: &str,
    previous_chapters: &[Chapter],
    current_section: &OutlineSection,
    timeout: Duration,
) -> NarraResult<ChapterOutput> {
    let model = catalog::map_writer_model(&form.llm_model);
    let formatted = context::format_writer_context(
        form,
        answers,
        validated_draft,
        draft_title,
        outline_text,
        previous_chapters,
        current_section,
    );
    let user_prompt = format!(
        "Scrivi la sezione del romanzo indicata di seguito.\n\n{formatted}\n\n\
         Scrivi SOLO il testo narrativo della sezione, senza titoli o numerazioni. \
         Inizia direttamente con la narrazione."
    );

    // The user's explicit temperature wins over the per-agent policy.
    let temperature = form
        .temperature
        .unwrap_or_else(|| gateway.temperature_for("writer_generator", model));

    let request = TextRequest {
        temperature,
        max_output_tokens: Some(MAX_CHAPTER_OUTPUT_TOKENS),
        timeout,
        ..TextRequest::new(prompts::WRITER_SYSTEM, user_prompt, model)
    };
    let response = gateway.generate_text(&request)?;
    Ok(ChapterOutput {
        content: response.text.trim().to_string(),
        usage: response.usage,
    })
}

//! Outline runner: form + answers + validated draft → Markdown
//! structure.

use std::time::Duration;

use narra_core::catalog;
use narra_core::errors::NarraResult;
use narra_core::models::form::{QuestionAnswer, SubmissionForm};
use narra_core::models::tokens::CallUsage;
use narra_llm::{LlmGateway, TextRequest};

use crate::{context, prompts};

pub struct OutlineOutput {
    pub outline_text: String,
    pub usage: CallUsage,
}

pub fn generate_outline(
    gateway: &LlmGateway,
    form: &SubmissionForm,
    answers: &[QuestionAnswer],
    validated_draft: &str,
    draft_title: Option<&str>,
    timeout: Duration,
) -> NarraResult<OutlineOutput> {
    let model = catalog::map_writer_model(&form.llm_model);

    let mut user_prompt = String::new();
    if let Some(title) = draft_title {
        user_prompt.push_str(&format!("# TITOLO: {title}\n\n"));
    }
    user_prompt.push_str(&format!(
        "Scheda del romanzo:\n\n{}\n\nRisposte alle domande preliminari:\n{}\n\n\
         ## TRAMA ESTESA VALIDATA\n{}\n\nProduci la struttura completa in Markdown.",
        context::format_form_block(form),
        context::format_answers_block(answers),
        validated_draft,
    ));

    let request = TextRequest {
        temperature: gateway.temperature_for("outline_generator", model),
        timeout,
        ..TextRequest::new(prompts::OUTLINE_SYSTEM, user_prompt, model)
    };
    let response = gateway.generate_text(&request)?;
    Ok(OutlineOutput {
        outline_text: response.text,
        usage: response.usage,
    })
}

//! Prompt-context assembly: the form block shared by all runners and the
//! full autoregressive writer context.

use narra_core::models::form::{QuestionAnswer, SubmissionForm};
use narra_core::models::session::Chapter;

use crate::sections::OutlineSection;

/// Renders the form as a labelled Markdown block, listing only the
/// fields the user filled.
pub fn format_form_block(form: &SubmissionForm) -> String {
    let mut lines = vec![format!("**Trama iniziale**: {}", form.plot)];
    let optional: [(&str, &Option<String>); 17] = [
        ("Nome Autore", &form.user_name),
        ("Genere", &form.genre),
        ("Sottogenere", &form.subgenre),
        ("Pubblico di Riferimento", &form.target_audience),
        ("Tema", &form.theme),
        ("Protagonista", &form.protagonist),
        ("Archetipo Protagonista", &form.protagonist_archetype),
        ("Arco del personaggio", &form.character_arc),
        ("Punto di vista", &form.point_of_view),
        ("Voce narrante", &form.narrative_voice),
        ("Stile", &form.style),
        ("Struttura temporale", &form.temporal_structure),
        ("Ritmo", &form.pace),
        ("Realismo", &form.realism),
        ("Ambiguità", &form.ambiguity),
        ("Intenzionalità", &form.intentionality),
        ("Autore di riferimento", &form.author),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            if !value.trim().is_empty() {
                lines.push(format!("**{label}**: {value}"));
            }
        }
    }
    lines.join("\n")
}

/// Renders the answered questions; skipped questions are omitted.
pub fn format_answers_block(answers: &[QuestionAnswer]) -> String {
    let mut lines = Vec::new();
    for qa in answers {
        if let Some(answer) = &qa.answer {
            if !answer.trim().is_empty() {
                lines.push(format!("- [{}] {}", qa.question_id, answer));
            }
        }
    }
    if lines.is_empty() {
        "Nessuna risposta fornita.".to_string()
    } else {
        lines.join("\n")
    }
}

/// Assembles the full context for one chapter: configuration, validated
/// draft, complete outline, every previously written chapter verbatim
/// (the autoregressive contract), and the current section.
#[allow(clippy::too_many_arguments)]
pub fn format_writer_context(
    form: &SubmissionForm,
    answers: &[QuestionAnswer],
    validated_draft: &str,
    draft_title: Option<&str>,
    outline_text: &str,
    previous_chapters: &[Chapter],
    current_section: &OutlineSection,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(title) = draft_title {
        lines.push(format!("# TITOLO DEL ROMANZO: {title}\n"));
    }

    lines.push("## CONFIGURAZIONE INIZIALE".to_string());
    lines.push(format_form_block(form));
    lines.push("\n## RISPOSTE ALLE DOMANDE PRELIMINARI".to_string());
    lines.push(format_answers_block(answers));
    lines.push("\n---\n".to_string());

    lines.push("## TRAMA ESTESA VALIDATA".to_string());
    lines.push(
        "Questa è la fonte di verità per gli eventi principali e lo sviluppo narrativo."
            .to_string(),
    );
    lines.push(validated_draft.to_string());
    lines.push("\n---\n".to_string());

    lines.push("## STRUTTURA COMPLETA DEL ROMANZO".to_string());
    lines.push(
        "Questa è la struttura completa. La sezione da scrivere è indicata di seguito."
            .to_string(),
    );
    lines.push(outline_text.to_string());
    lines.push("\n---\n".to_string());

    if !previous_chapters.is_empty() {
        lines.push("## CAPITOLI PRECEDENTI SCRITTI".to_string());
        lines.push(
            "**IMPORTANTE**: mantieni la massima coerenza con eventi, personaggi, \
             atmosfere e stile già stabiliti."
                .to_string(),
        );
        for chapter in previous_chapters {
            lines.push(format!("### {}", chapter.title));
            lines.push(chapter.content.clone());
            lines.push(String::new());
        }
        lines.push("---\n".to_string());
    }

    lines.push("## SEZIONE DA SCRIVERE ORA".to_string());
    lines.push(format!("**Titolo**: {}", current_section.title));
    lines.push("**Descrizione**:".to_string());
    lines.push(current_section.description.clone());
    lines.push(String::new());
    lines.push("**Istruzioni**:".to_string());
    lines.push("- Scrivi questa sezione seguendo la descrizione fornita.".to_string());
    lines.push("- Mantieni coerenza assoluta con i capitoli precedenti.".to_string());
    lines.push("- Inizia direttamente con la narrazione, senza titoli o numerazioni.".to_string());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_block_lists_only_filled_fields() {
        let form = SubmissionForm {
            llm_model: "gemini-3-pro".to_string(),
            plot: "Una storia".to_string(),
            genre: Some("giallo".to_string()),
            subgenre: Some(String::new()),
            ..Default::default()
        };
        let block = format_form_block(&form);
        assert!(block.contains("**Trama iniziale**: Una storia"));
        assert!(block.contains("**Genere**: giallo"));
        assert!(!block.contains("Sottogenere"));
    }

    #[test]
    fn writer_context_includes_previous_chapters_in_order() {
        let chapters = vec![
            Chapter {
                title: "Uno".to_string(),
                content: "primo testo".to_string(),
                section_index: 0,
            },
            Chapter {
                title: "Due".to_string(),
                content: "secondo testo".to_string(),
                section_index: 1,
            },
        ];
        let section = OutlineSection {
            title: "Tre".to_string(),
            description: "Il finale.".to_string(),
            level: 2,
        };
        let ctx = format_writer_context(
            &SubmissionForm::default(),
            &[],
            "trama",
            Some("Titolo"),
            "## Tre",
            &chapters,
            &section,
        );
        let uno = ctx.find("primo testo").unwrap();
        let due = ctx.find("secondo testo").unwrap();
        assert!(uno < due);
        assert!(ctx.contains("## SEZIONE DA SCRIVERE ORA"));
        assert!(ctx.contains("**Titolo**: Tre"));
    }
}

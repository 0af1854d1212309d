//! Cover stage: prompt assembly from a sanitized plot, primary model
//! with fallback, upload to the blob store. Failure here never fails the
//! book.

use std::sync::OnceLock;

use regex::Regex;

use narra_core::models::session::Session;
use narra_llm::ImageRequest;

use crate::services::Services;

/// Terms that trip image-model safety filters. Sentences containing any
/// of them are dropped from the cover prompt.
fn explicit_terms() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(sess[ou]\w*|erotic\w*|sensual\w*|nud[aoie]\w*|amant[ei]|passione|desiderio|intim\w*|baci[ao]\w*|lett[oi]\b)",
        )
        .expect("static regex compiles")
    })
}

const MAX_PLOT_CHARS: usize = 600;

/// Reduces the plot to safe, atmospheric material: sentences with
/// explicit or intimate language are dropped, the rest is capped. An
/// empty result falls back to a generic evocative line.
pub fn sanitize_plot(plot: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut total = 0usize;
    for sentence in plot.split_inclusive(['.', '!', '?']) {
        if explicit_terms().is_match(sentence) {
            continue;
        }
        let trimmed = sentence.trim();
        if trimmed.is_empty() {
            continue;
        }
        total += trimmed.chars().count();
        kept.push(trimmed);
        if total >= MAX_PLOT_CHARS {
            break;
        }
    }

    let joined = kept.join(" ");
    let capped: String = joined.chars().take(MAX_PLOT_CHARS).collect();
    if capped.trim().is_empty() {
        "Un'atmosfera evocativa e sospesa, luci e ombre che raccontano una storia.".to_string()
    } else {
        capped
    }
}

fn style_instruction(cover_style: Option<&str>) -> &'static str {
    match cover_style {
        Some("illustrato") => "Stile illustrato: immagine pittorica, evocativa e artistica.",
        Some("fotografico") => "Stile fotografico: resa realistica, da fotografia professionale.",
        Some("tipografico") => {
            "Stile tipografico/minimal: centralità del testo e composizione grafica elegante."
        }
        Some("simbolico") => "Stile simbolico: un'immagine metaforica che rappresenta il tema.",
        Some("cartoon") => "Stile cartoon: illustrazione stilizzata, vivace e moderna.",
        _ => "",
    }
}

fn cover_prompt(title: &str, author: &str, plot: &str, cover_style: Option<&str>) -> String {
    let mut prompt = format!(
        "Crea una copertina professionale per un libro.\n\n\
         **Titolo**: {title}\n**Autore**: {author}\n\n\
         **Atmosfera della storia**: {}\n\n\
         La copertina deve riportare titolo e autore in modo leggibile.",
        sanitize_plot(plot)
    );
    let style = style_instruction(cover_style);
    if !style.is_empty() {
        prompt.push_str("\n\n**Stile richiesto**: ");
        prompt.push_str(style);
    }
    prompt
}

/// Runs the cover stage for a completed book. Non-fatal by contract:
/// every failure path logs and returns.
pub fn run_cover_stage(services: &Services, session_id: &str) {
    let session = match services.sessions.load(session_id) {
        Ok(Some(session)) => session,
        Ok(None) => return,
        Err(err) => {
            tracing::warn!(session_id, error = %err, "cover stage could not load session");
            return;
        }
    };

    let bytes = match generate_cover_bytes(services, &session) {
        Some(bytes) => bytes,
        None => return,
    };

    let key = format!("covers/{session_id}_cover.png");
    let address = match services
        .blob
        .upload(&bytes, &key, "image/png", session.user_id.as_deref())
    {
        Ok(address) => address,
        Err(err) => {
            tracing::warn!(session_id, error = %err, "cover upload failed");
            return;
        }
    };

    if let Err(err) = services.sessions.update_cover_image_path(session_id, &address) {
        tracing::warn!(session_id, error = %err, "failed to persist cover path");
        return;
    }
    tracing::info!(session_id, %address, "cover generated");
}

fn generate_cover_bytes(services: &Services, session: &Session) -> Option<Vec<u8>> {
    let cover_config = &services.config.cover;
    let title = session.current_title.as_deref().unwrap_or("Romanzo");
    let author = session.form_data.user_name.as_deref().unwrap_or("Autore");
    let plot = session
        .current_draft
        .as_deref()
        .unwrap_or(&session.form_data.plot);
    let prompt = cover_prompt(title, author, plot, session.form_data.cover_style.as_deref());

    let timeout = services.timeout_ms(services.config.timeouts.cover_generation_ms);
    for model in [&cover_config.primary_model, &cover_config.fallback_model] {
        let request = ImageRequest {
            prompt: prompt.clone(),
            model: model.clone(),
            aspect_ratio: cover_config.aspect_ratio.clone(),
            image_size: cover_config.image_size.clone(),
            timeout,
        };
        match services.gateway.generate_image(&request) {
            Ok(bytes) if !bytes.is_empty() => return Some(bytes),
            Ok(_) => {
                tracing::warn!(session_id = %session.session_id, %model, "empty cover image")
            }
            Err(err) => {
                tracing::warn!(session_id = %session.session_id, %model, error = %err, "cover model failed")
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_sentences_are_dropped() {
        let plot = "Anna arriva alla villa. Una notte di passione travolge tutto. \
                    Il mare d'inverno nasconde un segreto.";
        let sanitized = sanitize_plot(plot);
        assert!(sanitized.contains("villa"));
        assert!(sanitized.contains("segreto"));
        assert!(!sanitized.to_lowercase().contains("passione"));
    }

    #[test]
    fn fully_filtered_plot_falls_back() {
        let sanitized = sanitize_plot("Una storia di passione e desiderio.");
        assert!(sanitized.contains("atmosfera"));
    }

    #[test]
    fn long_plots_are_capped() {
        let plot = "Una frase tranquilla sul paesaggio marino. ".repeat(50);
        assert!(sanitize_plot(&plot).chars().count() <= MAX_PLOT_CHARS);
    }

    #[test]
    fn prompt_carries_title_author_and_style() {
        let prompt = cover_prompt("Il Faro", "Anna", "Mare e nebbia.", Some("simbolico"));
        assert!(prompt.contains("Il Faro"));
        assert!(prompt.contains("Anna"));
        assert!(prompt.contains("Stile simbolico"));
    }
}

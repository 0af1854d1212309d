//! Critique runner: rendered book bytes → structured evaluation. Google
//! models read the PDF directly; OpenAI models get extracted text.

use std::time::Duration;

use narra_core::config::CriticConfig;
use narra_core::errors::NarraResult;
use narra_core::models::session::Critique;
use narra_core::models::tokens::CallUsage;
use narra_llm::{LlmGateway, MultimodalPart, TextRequest};

use crate::prompts;

pub struct CritiqueOutput {
    pub critique: Critique,
    pub usage: CallUsage,
}

pub fn generate_critique(
    gateway: &LlmGateway,
    config: &CriticConfig,
    title: &str,
    author: &str,
    pdf_bytes: &[u8],
    timeout: Duration,
) -> NarraResult<CritiqueOutput> {
    let system_prompt = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| prompts::CRITIC_SYSTEM.to_string());
    let user_template = config
        .user_prompt
        .clone()
        .unwrap_or_else(|| prompts::CRITIC_USER.to_string());
    let user_prompt = user_template
        .replace("{title}", title)
        .replace("{author}", author);

    let model = config.default_model.clone();
    let base = TextRequest {
        temperature: config.temperature,
        response_mime_type: config.response_mime_type.clone(),
        retries: Some(config.max_retries.max(1)),
        timeout,
        ..TextRequest::new(system_prompt, user_prompt, model.clone())
    };

    let response = if gateway.accepts_pdf(&model) {
        let parts = [MultimodalPart {
            mime_type: "application/pdf".to_string(),
            data: pdf_bytes.to_vec(),
        }];
        gateway.generate_multimodal(&base, &parts)?
    } else {
        // No native PDF input on this provider: feed extracted text,
        // capped to the model's context window.
        let book_text =
            gateway.extract_text_from_pdf(pdf_bytes, Some(config.max_pdf_chars))?;
        let request = TextRequest {
            user_prompt: format!(
                "{}\n\n## TESTO COMPLETO DEL ROMANZO\n{}",
                base.user_prompt, book_text
            ),
            ..base
        };
        gateway.generate_text(&request)?
    };

    Ok(CritiqueOutput {
        critique: parse_critique_response(&response.text),
        usage: response.usage,
    })
}

/// Parses the critique reply. Primary path: the first JSON object in the
/// text. Fallback: line heuristics: a number near "score"/"voto", and
/// pros/cons section headings collecting the lines beneath them.
pub fn parse_critique_response(raw: &str) -> Critique {
    if let Some(critique) = parse_json_critique(raw) {
        return critique;
    }

    let mut score = 5.0;
    let mut pros: Vec<String> = Vec::new();
    let mut cons: Vec<String> = Vec::new();
    let mut summary_lines: Vec<String> = Vec::new();
    let mut section: Option<&str> = None;

    for line in raw.lines() {
        let lower = line.to_lowercase();
        if lower.contains("score") || lower.contains("voto") || lower.contains("valutazione") {
            if let Some(value) = first_number(line) {
                score = clamp_score(value);
            }
            continue;
        }
        if lower.contains("punti di forza") || lower.contains("pros") {
            section = Some("pros");
            continue;
        }
        if lower.contains("punti deboli") || lower.contains("cons") || lower.contains("criticità")
        {
            section = Some("cons");
            continue;
        }
        if lower.contains("sintesi") || lower.contains("summary") || lower.contains("giudizio") {
            section = Some("summary");
            continue;
        }

        let cleaned = line.trim().trim_start_matches(['-', '•', '*', ' ']).trim();
        if cleaned.is_empty() {
            continue;
        }
        match section {
            Some("pros") => pros.push(cleaned.to_string()),
            Some("cons") => cons.push(cleaned.to_string()),
            Some("summary") => summary_lines.push(cleaned.to_string()),
            _ => {}
        }
    }

    let mut summary = summary_lines.join(" ");
    if summary.is_empty() && pros.is_empty() && cons.is_empty() {
        // Nothing structured at all: keep the raw reply as the summary.
        summary = raw.trim().to_string();
    }

    Critique {
        score,
        pros,
        cons,
        summary,
    }
}

fn parse_json_critique(raw: &str) -> Option<Critique> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(&raw[start..=end]).ok()?;

    let score = value.get("score").and_then(|v| v.as_f64())?;
    Some(Critique {
        score: clamp_score(score),
        pros: coerce_points(value.get("pros")),
        cons: coerce_points(value.get("cons")),
        summary: value
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string(),
    })
}

/// Normalizes pros/cons to a list of strings: accepts arrays, a single
/// string with bullet lines, or anything stringifiable.
fn coerce_points(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s.trim().to_string()),
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(serde_json::Value::String(s)) => s
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '•', '*', ' ']).to_string())
            .filter(|line| !line.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn first_number(line: &str) -> Option<f64> {
    let mut current = String::new();
    for ch in line.chars() {
        if ch.is_ascii_digit() || (ch == '.' && !current.is_empty()) {
            current.push(ch);
        } else if !current.is_empty() {
            break;
        }
    }
    current.parse().ok()
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let raw = r#"{"score": 7.5, "pros": ["ritmo", "dialoghi"], "cons": ["finale"], "summary": "Buono."}"#;
        let critique = parse_critique_response(raw);
        assert_eq!(critique.score, 7.5);
        assert_eq!(critique.pros, vec!["ritmo", "dialoghi"]);
        assert_eq!(critique.cons, vec!["finale"]);
        assert_eq!(critique.summary, "Buono.");
    }

    #[test]
    fn parses_json_inside_prose_and_clamps() {
        let raw = "Ecco la valutazione richiesta:\n{\"score\": 12, \"pros\": \"- trama\\n- stile\", \"cons\": [], \"summary\": \"ok\"}\nGrazie.";
        let critique = parse_critique_response(raw);
        assert_eq!(critique.score, 10.0);
        assert_eq!(critique.pros, vec!["trama", "stile"]);
    }

    #[test]
    fn heuristic_fallback_reads_sections() {
        let raw = "Voto: 6/10\n\nPunti di forza:\n- ambientazione\n\nPunti deboli:\n- personaggi piatti\n\nSintesi:\nUn esordio discreto.";
        let critique = parse_critique_response(raw);
        assert_eq!(critique.score, 6.0);
        assert_eq!(critique.pros, vec!["ambientazione"]);
        assert_eq!(critique.cons, vec!["personaggi piatti"]);
        assert!(critique.summary.contains("esordio"));
    }

    #[test]
    fn unstructured_reply_becomes_the_summary() {
        let raw = "Il romanzo scorre bene ma non sorprende.";
        let critique = parse_critique_response(raw);
        assert_eq!(critique.score, 5.0);
        assert_eq!(critique.summary, raw);
    }
}

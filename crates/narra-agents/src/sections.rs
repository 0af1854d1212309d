//! Outline section parsing: turns the Markdown outline into the ordered
//! list of sections the writing loop iterates over.

use narra_core::errors::{NarraError, NarraResult};

/// One writable section extracted from the outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineSection {
    pub title: String,
    pub description: String,
    /// Markdown heading level (1 = part, 2/3 = chapter).
    pub level: usize,
}

/// Parses the Markdown outline into writable sections.
///
/// Heading policy: when the outline groups chapters under `## Parte …`
/// headings, the H3 entries are the chapters; otherwise the H2 entries
/// are. If neither filter yields anything, H2∪H3 is tried, then any
/// level deeper than H1. A leading H1 that just titles the document
/// (struttura/indice/outline) is skipped.
pub fn parse_outline_sections(outline_text: &str) -> NarraResult<Vec<OutlineSection>> {
    if outline_text.trim().is_empty() {
        return Err(NarraError::Validation(
            "l'outline è vuoto: genera prima la struttura del romanzo".to_string(),
        ));
    }

    let mut sections: Vec<OutlineSection> = Vec::new();
    let mut current: Option<OutlineSection> = None;
    let mut description: Vec<String> = Vec::new();

    for raw_line in outline_text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('#') {
            if let Some(mut section) = current.take() {
                section.description = description.join("\n").trim().to_string();
                sections.push(section);
            }
            description.clear();

            let level = line.chars().take_while(|c| *c == '#').count();
            let title = line[level..].trim().to_string();
            if title.is_empty() {
                continue;
            }

            // Skip a document-title H1 at the very top.
            if level == 1 && sections.is_empty() {
                let lower = title.to_lowercase();
                if lower.contains("struttura")
                    || lower.contains("indice")
                    || lower.contains("outline")
                {
                    continue;
                }
            }

            current = Some(OutlineSection {
                title,
                description: String::new(),
                level,
            });
        } else if current.is_some() {
            description.push(line.to_string());
        }
    }
    if let Some(mut section) = current.take() {
        section.description = description.join("\n").trim().to_string();
        sections.push(section);
    }

    let has_parts = sections.iter().any(|s| {
        s.level == 2 && (s.title.contains("Parte") || s.title.contains("Part"))
    });

    let mut filtered: Vec<OutlineSection> = if has_parts {
        sections.iter().filter(|s| s.level == 3).cloned().collect()
    } else {
        sections.iter().filter(|s| s.level == 2).cloned().collect()
    };

    if filtered.is_empty() {
        filtered = sections
            .iter()
            .filter(|s| s.level == 2 || s.level == 3)
            .cloned()
            .collect();
    }
    if filtered.is_empty() {
        filtered = sections.iter().filter(|s| s.level > 1).cloned().collect();
    }

    if filtered.is_empty() {
        return Err(NarraError::Validation(format!(
            "nessuna sezione scrivibile trovata nella struttura ({} sezioni totali, nessuna di livello 2 o 3)",
            sections.len()
        )));
    }

    tracing::debug!(total = sections.len(), writable = filtered.len(), "outline parsed");
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_outline_uses_h2_chapters() {
        let outline = "# Struttura del romanzo\n\n\
            ## Capitolo 1: L'arrivo\nAnna arriva alla villa.\n\n\
            ## Capitolo 2: Il segreto\nLa cantina nasconde qualcosa.\n";
        let sections = parse_outline_sections(outline).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Capitolo 1: L'arrivo");
        assert_eq!(sections[0].description, "Anna arriva alla villa.");
        assert_eq!(sections[1].level, 2);
    }

    #[test]
    fn parts_promote_h3_to_chapters() {
        let outline = "## Parte I\n\
            ### Capitolo 1\nInizio.\n\
            ### Capitolo 2\nSviluppo.\n\
            ## Parte II\n\
            ### Capitolo 3\nFinale.\n";
        let sections = parse_outline_sections(outline).unwrap();
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Capitolo 1", "Capitolo 2", "Capitolo 3"]);
    }

    #[test]
    fn falls_back_to_any_level_below_h1() {
        let outline = "# Romanzo\n#### Scena 1\nUna scena.\n#### Scena 2\nUn'altra.\n";
        let sections = parse_outline_sections(outline).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].level, 4);
    }

    #[test]
    fn document_title_h1_is_skipped() {
        let outline = "# Indice\n## Capitolo 1\nTesto.\n";
        let sections = parse_outline_sections(outline).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Capitolo 1");
    }

    #[test]
    fn empty_outline_is_a_validation_error() {
        assert!(parse_outline_sections("   \n  ").is_err());
        assert!(parse_outline_sections("solo testo senza intestazioni").is_err());
    }
}

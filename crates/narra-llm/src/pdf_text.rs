//! PDF text extraction for providers without native PDF input.

use lopdf::Document;

use narra_core::errors::LlmError;

/// Extracts plain text from PDF bytes, page by page, capped at
/// `max_chars` characters. The cap is sized by the caller to the target
/// model's context window.
pub fn extract_text_from_pdf(
    pdf_bytes: &[u8],
    max_chars: Option<usize>,
) -> Result<String, LlmError> {
    if pdf_bytes.is_empty() {
        return Err(LlmError::PdfExtraction("empty PDF bytes".to_string()));
    }

    let doc = Document::load_mem(pdf_bytes)
        .map_err(|e| LlmError::PdfExtraction(format!("load PDF: {e}")))?;

    let mut out = String::new();
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    for page in page_numbers {
        match doc.extract_text(&[page]) {
            Ok(text) => {
                out.push_str(&text);
                out.push('\n');
            }
            // A single unreadable page should not sink the whole book.
            Err(err) => tracing::warn!(page, error = %err, "skipping unreadable PDF page"),
        }
        if let Some(cap) = max_chars {
            if out.chars().count() >= cap {
                break;
            }
        }
    }

    let trimmed = out.trim();
    if trimmed.is_empty() {
        return Err(LlmError::PdfExtraction(
            "no extractable text in PDF".to_string(),
        ));
    }

    let capped = match max_chars {
        Some(cap) => trimmed.chars().take(cap).collect(),
        None => trimmed.to_string(),
    };
    Ok(capped)
}

//! PDF text extraction against a generated document.

use narra_llm::pdf_text::extract_text_from_pdf;
use narra_llm::testing::sample_pdf;

#[test]
fn extracts_text_from_a_generated_pdf() {
    let pdf = sample_pdf("Il romanzo completo di prova");
    let text = extract_text_from_pdf(&pdf, None).unwrap();
    assert!(text.contains("Il romanzo completo di prova"), "got: {text}");
}

#[test]
fn caps_extracted_characters() {
    let pdf = sample_pdf("abcdefghij klmnopqrst uvwxyz");
    let text = extract_text_from_pdf(&pdf, Some(10)).unwrap();
    assert!(text.chars().count() <= 10);
}

#[test]
fn empty_and_garbage_inputs_fail_cleanly() {
    assert!(extract_text_from_pdf(&[], None).is_err());
    assert!(extract_text_from_pdf(b"not a pdf at all", None).is_err());
}

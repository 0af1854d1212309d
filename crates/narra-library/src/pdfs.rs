//! Scan of the local books directory: every rendered PDF with whatever
//! metadata its canonical filename carries.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One rendered PDF found on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfEntry {
    pub filename: String,
    pub title: Option<String>,
    pub created_date: Option<NaiveDate>,
    pub model_abbreviation: Option<String>,
    pub size_bytes: u64,
}

/// Lists the PDFs under `{data_dir}/books`, newest first, parsing the
/// `YYYY-MM-DD_{abbr}_{title}.pdf` filename back into its parts. Files
/// with foreign names still appear, with whatever could be parsed.
pub fn scan_books_dir(data_dir: &Path) -> Vec<PdfEntry> {
    let books_dir = data_dir.join("books");
    let Ok(read_dir) = std::fs::read_dir(&books_dir) else {
        return Vec::new();
    };

    let mut entries: Vec<(std::time::SystemTime, PdfEntry)> = Vec::new();
    for dir_entry in read_dir.flatten() {
        let path = dir_entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("pdf") {
            continue;
        }
        let Ok(metadata) = dir_entry.metadata() else {
            continue;
        };
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let stem = filename.trim_end_matches(".pdf");

        let mut parts = stem.splitn(3, '_');
        let created_date = parts
            .next()
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok());
        let model_abbreviation = parts.next().map(str::to_string);
        let title = parts.next().map(|raw| raw.replace('_', " "));

        entries.push((
            metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
            PdfEntry {
                filename,
                title,
                created_date,
                model_abbreviation,
                size_bytes: metadata.len(),
            },
        ));
    }

    entries.sort_by(|a, b| b.0.cmp(&a.0));
    entries.into_iter().map(|(_, entry)| entry).collect()
}

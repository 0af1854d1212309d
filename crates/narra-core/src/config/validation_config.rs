//! Content validation thresholds and page-count parameters.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Words per rendered page, used by the page-count estimate.
    pub words_per_page: usize,
    /// Table-of-contents rows per page.
    pub toc_chapters_per_page: usize,
    /// Minimum acceptable chapter length in characters.
    pub min_chapter_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            words_per_page: 250,
            toc_chapters_per_page: 30,
            min_chapter_length: 50,
        }
    }
}

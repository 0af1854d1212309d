//! Storage locations: database file, local data dir, optional GCS bucket.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
    /// Root for local covers/ and books/ directories.
    pub data_dir: String,
    /// When set, covers and rendered books go to this GCS bucket.
    pub gcs_bucket: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "narra.db".to_string(),
            data_dir: "data".to_string(),
            gcs_bucket: None,
        }
    }
}

//! Local filesystem blob store.

use std::fs;
use std::path::{Path, PathBuf};

use narra_core::errors::BlobError;

use crate::{fallback_keys, scoped_key, BlobStore};

/// Stores blobs under a root directory; addresses are absolute paths.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn io_err(path: &Path, err: std::io::Error) -> BlobError {
        BlobError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    fn resolve(&self, address: &str) -> PathBuf {
        let path = Path::new(address);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(address)
        }
    }
}

impl BlobStore for LocalBlobStore {
    fn upload(
        &self,
        data: &[u8],
        key: &str,
        _content_type: &str,
        user_id: Option<&str>,
    ) -> Result<String, BlobError> {
        let key = scoped_key(key, user_id);
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_err(parent, e))?;
        }
        fs::write(&path, data).map_err(|e| Self::io_err(&path, e))?;
        Ok(path.display().to_string())
    }

    fn download(&self, address: &str) -> Result<Vec<u8>, BlobError> {
        let primary = self.resolve(address);
        if primary.exists() {
            return fs::read(&primary).map_err(|e| Self::io_err(&primary, e));
        }

        // Retro-compat: strip the users/{uid}/ segment and retry under
        // the flat layout.
        if let Ok(relative) = primary.strip_prefix(&self.root) {
            for candidate in fallback_keys(&relative.to_string_lossy()) {
                let path = self.root.join(&candidate);
                if path.exists() {
                    return fs::read(&path).map_err(|e| Self::io_err(&path, e));
                }
            }
        }

        Err(BlobError::NotFound {
            path: address.to_string(),
        })
    }

    fn delete(&self, address: &str) -> Result<(), BlobError> {
        let path = self.resolve(address);
        if !path.exists() {
            return Err(BlobError::NotFound {
                path: address.to_string(),
            });
        }
        fs::remove_file(&path).map_err(|e| Self::io_err(&path, e))
    }

    fn signed_url(&self, _address: &str, _ttl_seconds: u64) -> Result<String, BlobError> {
        Err(BlobError::SigningUnsupported)
    }
}

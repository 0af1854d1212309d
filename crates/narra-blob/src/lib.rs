//! # narra-blob
//!
//! The blob-store boundary: an opaque byte store addressed by
//! `gs://bucket/key` or a local absolute path. Covers live under
//! `covers/` (or `users/{uid}/covers/…`), rendered books under `books/`.
//! The local filesystem implementation is complete; the GCS one speaks
//! the JSON API over HTTP with a bearer token.

pub mod address;
pub mod gcs;
pub mod local;

pub use address::BlobAddress;
pub use gcs::GcsBlobStore;
pub use local::LocalBlobStore;

use narra_core::errors::BlobError;

/// The boundary the engine sees: upload/download/delete plus best-effort
/// signing. Addresses returned by `upload` are opaque to callers and fed
/// back verbatim to `download`/`delete`.
pub trait BlobStore: Send + Sync {
    /// Stores bytes at a logical key (e.g. `covers/abc_cover.png`),
    /// scoped under `users/{uid}/` when an owner is given. Returns the
    /// opaque address to persist.
    fn upload(
        &self,
        data: &[u8],
        key: &str,
        content_type: &str,
        user_id: Option<&str>,
    ) -> Result<String, BlobError>;

    /// Fetches a previously stored blob. Implementations must apply the
    /// retro-compatibility rule: `users/{uid}/covers/X` also tries
    /// `covers/X`, and the reverse is attempted for unscoped cover keys.
    fn download(&self, address: &str) -> Result<Vec<u8>, BlobError>;

    fn delete(&self, address: &str) -> Result<(), BlobError>;

    /// A URL a browser can fetch, when the backend supports it.
    fn signed_url(&self, address: &str, ttl_seconds: u64) -> Result<String, BlobError>;
}

/// Applies the per-user prefix to a logical key: `covers/X` becomes
/// `users/{uid}/covers/X` (same for `books/`), anything else is scoped
/// under `users/{uid}/` directly.
pub fn scoped_key(key: &str, user_id: Option<&str>) -> String {
    let Some(uid) = user_id else {
        return key.to_string();
    };
    if let Some(rest) = key.strip_prefix("covers/") {
        format!("users/{uid}/covers/{rest}")
    } else if let Some(rest) = key.strip_prefix("books/") {
        format!("users/{uid}/books/{rest}")
    } else {
        format!("users/{uid}/{key}")
    }
}

/// Candidate keys for a download, most specific first. Implements the
/// retro-compatibility between user-scoped and flat cover/book layouts.
pub fn fallback_keys(key: &str) -> Vec<String> {
    let mut candidates = vec![key.to_string()];
    // users/{uid}/covers/X → covers/X (same for books).
    if let Some(idx) = key.find("/covers/") {
        if key.starts_with("users/") {
            candidates.push(format!("covers/{}", &key[idx + "/covers/".len()..]));
        }
    }
    if let Some(idx) = key.find("/books/") {
        if key.starts_with("users/") {
            candidates.push(format!("books/{}", &key[idx + "/books/".len()..]));
        }
    }
    candidates
}

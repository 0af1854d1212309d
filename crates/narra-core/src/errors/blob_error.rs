//! Blob store errors.

/// Errors raised by the blob-store boundary (local filesystem or GCS).
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob not found: {path}")]
    NotFound { path: String },

    #[error("invalid blob address: {path}")]
    InvalidAddress { path: String },

    #[error("I/O error for {path}: {message}")]
    Io { path: String, message: String },

    #[error("GCS request failed with HTTP {status}: {body}")]
    Gcs { status: u16, body: String },

    #[error("signing not supported by this backend")]
    SigningUnsupported,
}

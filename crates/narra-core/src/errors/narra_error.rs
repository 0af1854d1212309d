//! Top-level error type for the Narra engine.
//! All subsystem errors convert into this via `From` impls.

use chrono::{DateTime, Utc};

use super::{BlobError, LlmError, StoreError};
use crate::models::user::CreditMode;

#[derive(Debug, thiserror::Error)]
pub enum NarraError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("outline is frozen: writing already started (chapter {current_step}/{total_steps})")]
    OutlineFrozen {
        current_step: u32,
        total_steps: u32,
    },

    #[error("no {mode} credits left; pool resets at {next_reset_at}")]
    CreditsExhausted {
        mode: CreditMode,
        next_reset_at: DateTime<Utc>,
    },

    #[error("LLM failure: {0}")]
    Llm(#[from] LlmError),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias.
pub type NarraResult<T> = Result<T, NarraError>;

// Ownership and freeze failures keep their role when crossing the
// store boundary; everything else becomes a generic store error.
impl From<StoreError> for NarraError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound { session_id } => {
                NarraError::NotFound(format!("session {session_id}"))
            }
            StoreError::UserNotFound { user_id } => {
                NarraError::NotFound(format!("user {user_id}"))
            }
            StoreError::Unauthorized { session_id } => {
                NarraError::Unauthorized(format!("session {session_id}"))
            }
            StoreError::OutlineFrozen {
                current_step,
                total_steps,
            } => NarraError::OutlineFrozen {
                current_step,
                total_steps,
            },
            other => NarraError::Store(other),
        }
    }
}

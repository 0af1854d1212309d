//! Persistence-layer errors.

/// Errors raised by the session store, the credit ledger and the user store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("user not found: {user_id}")]
    UserNotFound { user_id: String },

    #[error("access denied: session {session_id} belongs to another user")]
    Unauthorized { session_id: String },

    #[error(
        "outline is frozen: writing already started (chapter {current_step}/{total_steps})"
    )]
    OutlineFrozen {
        current_step: u32,
        total_steps: u32,
    },

    #[error("email already registered: {email}")]
    DuplicateEmail { email: String },

    #[error("SQLite error: {message}")]
    Sqlite { message: String },

    #[error("corrupt session document for {session_id}: {message}")]
    CorruptDocument {
        session_id: String,
        message: String,
    },
}

/// Convenience type alias.
pub type StoreResult<T> = Result<T, StoreError>;

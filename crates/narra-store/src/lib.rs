//! # narra-store
//!
//! SQLite persistence layer for the Narra engine. One row per session with
//! JSON subdocument columns (the document shape of the data model on a
//! relational engine), plus the user table carrying the weekly credit
//! pools. Single write connection behind a mutex; every mutation is
//! load → modify → persist with the store as the arbiter.

pub mod credits;
pub mod migrations;
pub mod pool;
pub mod sessions;
pub mod users;

pub use credits::CreditLedger;
pub use pool::StorePool;
pub use sessions::{Projection, SessionFilters, SessionStore};
pub use users::UserStore;

use narra_core::errors::StoreError;

/// Helper to convert an error message into a `StoreError::Sqlite`.
pub fn to_store_err(msg: impl std::fmt::Display) -> StoreError {
    StoreError::Sqlite {
        message: msg.to_string(),
    }
}

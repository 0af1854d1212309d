//! # narra-core
//!
//! Foundation crate for the Narra book-generation engine.
//! Defines the session aggregate and its subdocuments, the error taxonomy,
//! configuration, the model catalog, and the boundary traits.
//! Every other crate in the workspace depends on this.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod models;
pub mod observability;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::NarraConfig;
pub use errors::{NarraError, NarraResult};
pub use models::session::{Session, SessionStatus};

//! # narra-agents
//!
//! The five stateless agent runners (questions, draft, outline, chapter,
//! critique) plus the outline section parser and the prompt-context
//! assembly. Each runner consumes config-loaded prompts and the session's
//! inputs, calls the gateway, and returns structured output with token
//! usage. No runner touches the store.

pub mod chapter;
pub mod context;
pub mod critique;
pub mod draft;
pub mod outline;
pub mod prompts;
pub mod questions;
pub mod sections;

pub use chapter::generate_chapter;
pub use critique::{generate_critique, parse_critique_response};
pub use draft::{generate_draft, parse_draft_response};
pub use outline::generate_outline;
pub use questions::generate_questions;
pub use sections::{parse_outline_sections, OutlineSection};

//! # narra-engine
//!
//! The generation orchestrator: background tasks that drive a session
//! through questions → draft → outline → writing → cover → critique,
//! surviving partial failure. One generation task per session at a time,
//! enforced by the supervisor. Also home to the progress tracker and the
//! cost accounting.

pub mod cost;
pub mod cover;
pub mod critique;
pub mod engine;
pub mod prep;
pub mod progress;
pub mod services;
pub mod supervisor;
pub mod writing;

pub use engine::Engine;
pub use services::Services;
pub use supervisor::TaskSupervisor;

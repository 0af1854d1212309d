//! Boundary traits: rendering and notification. The engine only sees
//! these contracts; concrete implementations live outside the core.

use serde_json::Value;

use crate::models::session::Session;

/// Output formats the rendering boundary can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Pdf,
    Epub,
    Docx,
}

/// Renders a finished (or in-flight) session into a document.
/// Implementations are expected to be CPU-bound and synchronous; the
/// engine calls them from its own background threads.
pub trait BookRenderer: Send + Sync {
    fn render(&self, session: &Session, format: RenderFormat) -> Result<Vec<u8>, String>;
}

/// Events the engine emits toward the notification boundary.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    /// Event kind, e.g. "book_completed".
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data: Value,
}

impl NotificationEvent {
    pub fn book_completed(session_id: &str, book_title: &str) -> Self {
        Self {
            kind: "book_completed".to_string(),
            title: "Libro completato!".to_string(),
            message: format!("\"{book_title}\" è pronto per la lettura!"),
            data: serde_json::json!({
                "session_id": session_id,
                "book_title": book_title,
            }),
        }
    }
}

/// Fire-and-forget user notifications. Failures are the implementor's
/// problem; the engine logs and moves on.
pub trait Notifier: Send + Sync {
    fn notify(&self, user_id: &str, event: NotificationEvent);
}

/// A notifier that drops everything. Useful as the default collaborator
/// and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _user_id: &str, _event: NotificationEvent) {}
}

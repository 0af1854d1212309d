pub mod form;
pub mod library;
pub mod progress;
pub mod session;
pub mod tokens;
pub mod user;

pub use form::{Question, QuestionAnswer, QuestionKind, SubmissionForm};
pub use library::{AdvancedStats, LibraryEntry, LibraryStats, ModelComparisonEntry};
pub use progress::{PhaseProgress, PhaseStatus, WritingProgress, WritingProgressPatch};
pub use session::{Chapter, Critique, CritiqueStatus, DraftRevision, Session, SessionStatus};
pub use tokens::{CallUsage, Phase, PhaseUsage, TokenUsage};
pub use user::{CreditMode, ModeCredits, User, UserRole};

//! In-memory adapters for workflow tests and examples.

mod mentions;
mod notifications;
mod repository;

pub use mentions::DirectoryMentionScanner;
pub use notifications::RecordingNotificationSink;
pub use repository::InMemoryWorkflowRepository;

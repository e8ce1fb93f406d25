//! Port contracts for the workflow engine.
//!
//! Ports define infrastructure-agnostic interfaces used by workflow
//! services.

pub mod mentions;
pub mod notifications;
pub mod repository;

pub use mentions::MentionScanner;
pub use notifications::{NotificationError, NotificationSink};
pub use repository::{WorkflowRepository, WorkflowRepositoryError, WorkflowRepositoryResult};

//! Repository port for workflow persistence.

use crate::workflow::domain::{
    Stakeholder, StatusChangeRecord, Task, TaskId, WorkflowMutation, WorkflowSnapshot,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for workflow repository operations.
pub type WorkflowRepositoryResult<T> = Result<T, WorkflowRepositoryError>;

/// Workflow persistence contract.
///
/// Concurrency model: `load` returns a versioned snapshot and `commit`
/// applies one [`WorkflowMutation`] atomically, failing with
/// [`WorkflowRepositoryError::StaleSnapshot`] when another commit landed
/// in between. Serialising concurrent mutations per task is the adapter's
/// responsibility; callers retry by reloading and re-planning.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Stores a new task with its stakeholders and creation ledger record
    /// in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::DuplicateTask`] when the task ID
    /// already exists.
    async fn insert(
        &self,
        task: &Task,
        stakeholders: &[Stakeholder],
        creation_record: &StatusChangeRecord,
    ) -> WorkflowRepositoryResult<()>;

    /// Loads the versioned workflow snapshot for a task.
    ///
    /// Returns `None` when the task does not exist.
    async fn load(&self, task_id: TaskId) -> WorkflowRepositoryResult<Option<WorkflowSnapshot>>;

    /// Commits one mutation atomically against the expected version.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::StaleSnapshot`] when the task
    /// version moved since the snapshot was loaded.
    async fn commit(
        &self,
        task_id: TaskId,
        expected_version: i64,
        mutation: WorkflowMutation,
    ) -> WorkflowRepositoryResult<()>;

    /// Returns the full status-change ledger of a task in chronological
    /// order.
    async fn history(&self, task_id: TaskId) -> WorkflowRepositoryResult<Vec<StatusChangeRecord>>;

    /// Deletes a task, cascading its ledger, votes, and stakeholders.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::NotFound`] when the task does
    /// not exist.
    async fn remove(&self, task_id: TaskId) -> WorkflowRepositoryResult<()>;
}

/// Errors returned by workflow repository implementations.
#[derive(Debug, Clone, Error)]
pub enum WorkflowRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The snapshot version moved under a concurrent commit.
    #[error("workflow state for task {0} changed concurrently")]
    StaleSnapshot(TaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkflowRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

//! Application services orchestrating the workflow.

mod engine;
mod registry;

pub use engine::{CreateTaskRequest, TransitionEngine};
pub use registry::StakeholderRegistry;

use crate::workflow::domain::{Notice, TaskId, WorkflowError, WorkflowSnapshot, WorkflowStep};
use crate::workflow::ports::{NotificationSink, WorkflowRepository, WorkflowRepositoryError};
use thiserror::Error;

/// Service-level errors for workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowServiceError {
    /// Domain validation or authorisation failed.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] WorkflowRepositoryError),
}

/// Result type for workflow service operations.
pub type WorkflowServiceResult<T> = Result<T, WorkflowServiceError>;

/// Commit attempts before a contended task surfaces as an error.
const MAX_COMMIT_ATTEMPTS: u32 = 8;

/// Load, plan, commit loop with optimistic retry.
///
/// Re-loads the snapshot and re-plans on every stale commit, so decisions
/// such as "all votes approved" are always made against fresh state.
async fn run_committed<R, O, F>(
    repository: &R,
    task_id: TaskId,
    plan: F,
) -> WorkflowServiceResult<(O, Vec<Notice>)>
where
    R: WorkflowRepository + ?Sized,
    F: Fn(&WorkflowSnapshot) -> Result<WorkflowStep<O>, WorkflowError>,
{
    for _ in 0..MAX_COMMIT_ATTEMPTS {
        let snapshot = repository
            .load(task_id)
            .await?
            .ok_or(WorkflowRepositoryError::NotFound(task_id))?;
        let step = plan(&snapshot)?;
        match repository
            .commit(task_id, snapshot.version(), step.mutation)
            .await
        {
            Ok(()) => return Ok((step.outcome, step.notices)),
            Err(WorkflowRepositoryError::StaleSnapshot(_)) => {}
            Err(err) => return Err(err.into()),
        }
    }
    Err(WorkflowRepositoryError::StaleSnapshot(task_id).into())
}

/// Fans out notices post-commit.
///
/// Drops the sender from each recipient set, skips emptied notices, and
/// logs-and-swallows sink failures: an unreachable notification channel is
/// not a reason to fail a committed state change.
async fn dispatch<N>(sink: &N, notices: Vec<Notice>)
where
    N: NotificationSink + ?Sized,
{
    for mut notice in notices {
        notice.drop_sender();
        if notice.recipients().is_empty() {
            continue;
        }
        if let Err(err) = sink.notify(&notice).await {
            tracing::warn!(
                task_id = %notice.task_id(),
                error = %err,
                "notification dispatch failed",
            );
        }
    }
}

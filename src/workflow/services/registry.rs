//! Stakeholder registry: per-task voting membership.

use super::{WorkflowServiceResult, dispatch, run_committed};
use crate::workflow::domain::{Actor, MemberId, Stakeholder, StakeholderRole, TaskId};
use crate::workflow::ports::{NotificationSink, WorkflowRepository, WorkflowRepositoryError};
use mockable::Clock;
use std::sync::Arc;

/// Manages the set of members with voting rights over a task.
///
/// Mutations ride the same versioned commit path as status transitions,
/// so enrolment changes serialise with ballot opens. Open ballots are
/// never affected: their vote set was fixed when the ballot opened.
#[derive(Clone)]
pub struct StakeholderRegistry<R, N, C>
where
    R: WorkflowRepository,
    N: NotificationSink,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    notifications: Arc<N>,
    clock: Arc<C>,
}

impl<R, N, C> StakeholderRegistry<R, N, C>
where
    R: WorkflowRepository,
    N: NotificationSink,
    C: Clock + Send + Sync,
{
    /// Creates a new stakeholder registry.
    #[must_use]
    pub const fn new(repository: Arc<R>, notifications: Arc<N>, clock: Arc<C>) -> Self {
        Self {
            repository,
            notifications,
            clock,
        }
    }

    /// Enrols a member as a stakeholder; creator or admin only.
    ///
    /// The member is notified of the enrolment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::workflow::domain::WorkflowError::NotAuthorized`]
    /// or [`crate::workflow::domain::WorkflowError::DuplicateStakeholder`]
    /// per the registry rules, or a repository error when the task is
    /// missing or persistence fails.
    pub async fn add(
        &self,
        task_id: TaskId,
        actor: &Actor,
        member: MemberId,
        role: StakeholderRole,
    ) -> WorkflowServiceResult<Stakeholder> {
        let (stakeholder, notices) = run_committed(&*self.repository, task_id, |snapshot| {
            snapshot.plan_stakeholder_addition(actor, member, role, &*self.clock)
        })
        .await?;
        dispatch(&*self.notifications, notices).await;
        Ok(stakeholder)
    }

    /// Removes a stakeholder; creator or admin only.
    ///
    /// # Errors
    ///
    /// Returns [`crate::workflow::domain::WorkflowError::NotAuthorized`]
    /// or [`crate::workflow::domain::WorkflowError::StakeholderNotFound`]
    /// per the registry rules, or a repository error when the task is
    /// missing or persistence fails.
    pub async fn remove(
        &self,
        task_id: TaskId,
        actor: &Actor,
        member: MemberId,
    ) -> WorkflowServiceResult<()> {
        let ((), notices) = run_committed(&*self.repository, task_id, |snapshot| {
            snapshot.plan_stakeholder_removal(actor, member)
        })
        .await?;
        dispatch(&*self.notifications, notices).await;
        Ok(())
    }

    /// Lists the stakeholders of a task.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the task is missing or persistence
    /// lookup fails.
    pub async fn list(&self, task_id: TaskId) -> WorkflowServiceResult<Vec<Stakeholder>> {
        let snapshot = self
            .repository
            .load(task_id)
            .await?
            .ok_or(WorkflowRepositoryError::NotFound(task_id))?;
        Ok(snapshot.stakeholders().to_vec())
    }
}

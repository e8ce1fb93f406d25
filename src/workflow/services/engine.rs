//! Transition engine: the state machine over task status.
//!
//! Validates legality, decides whether a transition needs a ballot,
//! applies or defers, tallies votes, and resolves outcomes. Notification
//! dispatch and mention scanning are injected capabilities; their failure
//! never affects the committed state change.

use super::{WorkflowServiceResult, dispatch, run_committed};
use crate::workflow::domain::{
    Actor, MemberId, Notice, NoticeKind, ProjectId, Stakeholder, StakeholderRole, StatusChangeId,
    StatusChangeRecord, Task, TaskId, TransitionOutcome, TransitionRequest, VoteAction,
    VoteOutcome, WorkflowError, WorkflowSnapshot,
};
use crate::workflow::ports::{
    MentionScanner, NotificationSink, WorkflowRepository, WorkflowRepositoryError,
};
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    project_id: ProjectId,
    title: String,
    description: Option<String>,
    assignee: Option<MemberId>,
    stakeholders: Vec<(MemberId, StakeholderRole)>,
}

impl CreateTaskRequest {
    /// Creates a request with required fields.
    #[must_use]
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            project_id,
            title: title.into(),
            description: None,
            assignee: None,
            stakeholders: Vec::new(),
        }
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the task assignee.
    #[must_use]
    pub const fn with_assignee(mut self, assignee: MemberId) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Enrols a stakeholder at creation time.
    #[must_use]
    pub fn with_stakeholder(mut self, member: MemberId, role: StakeholderRole) -> Self {
        self.stakeholders.push((member, role));
        self
    }
}

/// The workflow state machine service.
///
/// Every state-changing entry point runs one load/plan/commit cycle with
/// optimistic retry and fans out notifications only after the commit
/// succeeded.
#[derive(Clone)]
pub struct TransitionEngine<R, N, M, C>
where
    R: WorkflowRepository,
    N: NotificationSink,
    M: MentionScanner,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    notifications: Arc<N>,
    mentions: Arc<M>,
    clock: Arc<C>,
}

impl<R, N, M, C> TransitionEngine<R, N, M, C>
where
    R: WorkflowRepository,
    N: NotificationSink,
    M: MentionScanner,
    C: Clock + Send + Sync,
{
    /// Creates a new transition engine.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        notifications: Arc<N>,
        mentions: Arc<M>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            repository,
            notifications,
            mentions,
            clock,
        }
    }

    /// Creates a task at `todo` and writes the initial ledger record.
    ///
    /// The creation event is never gated, regardless of stakeholders.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::DuplicateStakeholder`] when a member is
    /// listed twice, or a repository error when persistence fails.
    pub async fn create_task(
        &self,
        actor: &Actor,
        request: CreateTaskRequest,
    ) -> WorkflowServiceResult<Task> {
        let mut task = Task::new(
            request.project_id,
            request.title,
            actor.member_id(),
            &*self.clock,
        );
        if let Some(description) = request.description {
            task = task.with_description(description);
        }
        if let Some(assignee) = request.assignee {
            task = task.with_assignee(assignee);
        }

        let stakeholders = Self::enrol_stakeholders(&task, request.stakeholders, &*self.clock)?;
        let record = StatusChangeRecord::creation(task.id(), actor.member_id(), self.clock.utc());
        self.repository
            .insert(&task, &stakeholders, &record)
            .await?;

        let notices = self.creation_notices(actor, &task, &stakeholders);
        dispatch(&*self.notifications, notices).await;
        Ok(task)
    }

    /// Requests a status change on a task.
    ///
    /// Applies immediately, or opens a ballot and leaves the status
    /// untouched when stakeholder approval is required.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotAuthorized`],
    /// [`WorkflowError::InvalidTransition`], or
    /// [`WorkflowError::ApprovalInFlight`] per the state machine rules, or
    /// a repository error when the task is missing or persistence fails.
    pub async fn request_transition(
        &self,
        task_id: TaskId,
        actor: &Actor,
        request: TransitionRequest,
    ) -> WorkflowServiceResult<TransitionOutcome> {
        let (outcome, mut notices) = run_committed(&*self.repository, task_id, |snapshot| {
            snapshot.plan_transition(actor, &request, &*self.clock)
        })
        .await?;

        if let TransitionOutcome::Applied { task, .. } = &outcome {
            if let Some(feedback) = request.review_feedback() {
                notices.extend(self.mention_notice(actor.member_id(), task, feedback));
            }
        }
        dispatch(&*self.notifications, notices).await;
        Ok(outcome)
    }

    /// Casts a stakeholder's vote on the open ballot.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NoSuchBallot`] when no pending vote
    /// matches, or a repository error when the task is missing or
    /// persistence fails.
    pub async fn cast_vote(
        &self,
        task_id: TaskId,
        change_id: StatusChangeId,
        voter: MemberId,
        action: VoteAction,
        comment: Option<String>,
    ) -> WorkflowServiceResult<VoteOutcome> {
        let (outcome, notices) = run_committed(&*self.repository, task_id, |snapshot| {
            snapshot.plan_vote(change_id, voter, action, comment.clone(), &*self.clock)
        })
        .await?;
        dispatch(&*self.notifications, notices).await;
        Ok(outcome)
    }

    /// Withdraws the open ballot; only the original requester may do so.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NoOpenBallot`] or
    /// [`WorkflowError::NotRequester`] per the cancellation rules, or a
    /// repository error when the task is missing or persistence fails.
    pub async fn cancel_ballot(
        &self,
        task_id: TaskId,
        actor: &Actor,
    ) -> WorkflowServiceResult<StatusChangeRecord> {
        let actor_id = actor.member_id();
        let (record, notices) = run_committed(&*self.repository, task_id, |snapshot| {
            snapshot.plan_cancellation(actor_id)
        })
        .await?;
        dispatch(&*self.notifications, notices).await;
        Ok(record)
    }

    /// Deletes a task, cascading its ledger, votes, and stakeholders.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotAuthorized`] for actors without the
    /// creator or admin capability, or a repository error when the task is
    /// missing or persistence fails.
    pub async fn delete_task(&self, task_id: TaskId, actor: &Actor) -> WorkflowServiceResult<()> {
        let snapshot = self.load_or_missing(task_id).await?;
        snapshot.ensure_administered_by(actor)?;
        Ok(self.repository.remove(task_id).await?)
    }

    /// Returns the current workflow snapshot for a task, if it exists.
    ///
    /// # Errors
    ///
    /// Returns a repository error when persistence lookup fails.
    pub async fn workflow(
        &self,
        task_id: TaskId,
    ) -> WorkflowServiceResult<Option<WorkflowSnapshot>> {
        Ok(self.repository.load(task_id).await?)
    }

    /// Returns the chronological status-change ledger of a task.
    ///
    /// Consumed read-only by reporting; records are returned oldest first.
    ///
    /// # Errors
    ///
    /// Returns a repository error when persistence lookup fails.
    pub async fn history(
        &self,
        task_id: TaskId,
    ) -> WorkflowServiceResult<Vec<StatusChangeRecord>> {
        Ok(self.repository.history(task_id).await?)
    }

    async fn load_or_missing(&self, task_id: TaskId) -> WorkflowServiceResult<WorkflowSnapshot> {
        Ok(self
            .repository
            .load(task_id)
            .await?
            .ok_or(WorkflowRepositoryError::NotFound(task_id))?)
    }

    fn enrol_stakeholders(
        task: &Task,
        entries: Vec<(MemberId, StakeholderRole)>,
        clock: &impl Clock,
    ) -> Result<Vec<Stakeholder>, WorkflowError> {
        let mut seen = BTreeSet::new();
        let mut stakeholders = Vec::with_capacity(entries.len());
        for (member, role) in entries {
            if !seen.insert(member) {
                return Err(WorkflowError::DuplicateStakeholder {
                    task_id: task.id(),
                    member,
                });
            }
            stakeholders.push(Stakeholder::new(member, role, clock));
        }
        Ok(stakeholders)
    }

    fn creation_notices(
        &self,
        actor: &Actor,
        task: &Task,
        stakeholders: &[Stakeholder],
    ) -> Vec<Notice> {
        let mut notices = Vec::new();
        if !stakeholders.is_empty() {
            let recipients = stakeholders.iter().map(Stakeholder::member_id).collect();
            notices.push(Notice::new(
                actor.member_id(),
                task,
                recipients,
                NoticeKind::StakeholderAdded,
            ));
        }
        if let Some(assignee) = task.assignee() {
            notices.push(Notice::new(
                actor.member_id(),
                task,
                BTreeSet::from([assignee]),
                NoticeKind::TaskAssigned,
            ));
        }
        if let Some(description) = task.description() {
            notices.extend(self.mention_notice(actor.member_id(), task, description));
        }
        notices
    }

    fn mention_notice(&self, sender: MemberId, task: &Task, text: &str) -> Option<Notice> {
        let mentioned = self.mentions.mentions(text);
        (!mentioned.is_empty())
            .then(|| Notice::new(sender, task, mentioned, NoticeKind::Mentioned))
    }
}

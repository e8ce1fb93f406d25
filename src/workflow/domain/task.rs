//! Task aggregate root.

use super::{AllowedStatuses, MemberId, ProjectId, TaskId, TaskStatus, WorkflowError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Task aggregate root.
///
/// Carries only the columns the transition engine reads and writes; the
/// surrounding CRUD layer owns everything else about a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    project_id: ProjectId,
    title: String,
    description: Option<String>,
    assignee: Option<MemberId>,
    created_by: MemberId,
    status: TaskStatus,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted owning project.
    pub project_id: ProjectId,
    /// Persisted title.
    pub title: String,
    /// Persisted description, if any.
    pub description: Option<String>,
    /// Persisted assignee, if any.
    pub assignee: Option<MemberId>,
    /// Persisted creator.
    pub created_by: MemberId,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted completion timestamp, if any.
    pub completed_at: Option<DateTime<Utc>>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new task at [`TaskStatus::Todo`].
    #[must_use]
    pub fn new(
        project_id: ProjectId,
        title: impl Into<String>,
        created_by: MemberId,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            project_id,
            title: title.into(),
            description: None,
            assignee: None,
            created_by,
            status: TaskStatus::Todo,
            completed_at: None,
            created_at: timestamp,
            updated_at: timestamp,
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
    pub fn with_assignee(mut self, assignee: MemberId) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            title: data.title,
            description: data.description,
            assignee: data.assignee,
            created_by: data.created_by,
            status: data.status,
            completed_at: data.completed_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the task description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub const fn assignee(&self) -> Option<MemberId> {
        self.assignee
    }

    /// Returns the creator.
    #[must_use]
    pub const fn created_by(&self) -> MemberId {
        self.created_by
    }

    /// Returns the current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the completion timestamp, set only while status is `done`.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a validated status transition.
    ///
    /// Entering `done` stamps `completed_at`; entering any other status
    /// clears it.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidTransition`] when `next` is not in
    /// the allowed-successor set of the current status.
    pub fn apply_status(&mut self, next: TaskStatus, clock: &impl Clock) -> Result<(), WorkflowError> {
        if !self.status.can_transition_to(next) {
            return Err(WorkflowError::InvalidTransition {
                from: self.status,
                to: next,
                allowed: AllowedStatuses::of(self.status),
            });
        }
        let timestamp = clock.utc();
        self.status = next;
        self.completed_at = (next == TaskStatus::Done).then_some(timestamp);
        self.updated_at = timestamp;
        Ok(())
    }
}

//! Diesel row models for workflow persistence.

use super::schema::{task_stakeholders, task_status_approvals, task_status_history, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Optional task description.
    pub description: Option<String>,
    /// Optional assignee.
    pub assignee_id: Option<uuid::Uuid>,
    /// Creator.
    pub created_by: uuid::Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Optional task description.
    pub description: Option<String>,
    /// Optional assignee.
    pub assignee_id: Option<uuid::Uuid>,
    /// Creator.
    pub created_by: uuid::Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for stakeholder enrolments.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_stakeholders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StakeholderRow {
    /// Task the stakeholder belongs to.
    pub task_id: uuid::Uuid,
    /// Enrolled member.
    pub member_id: uuid::Uuid,
    /// Informational role.
    pub role: String,
    /// Enrolment timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for stakeholder enrolments.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_stakeholders)]
pub struct NewStakeholderRow {
    /// Task the stakeholder belongs to.
    pub task_id: uuid::Uuid,
    /// Enrolled member.
    pub member_id: uuid::Uuid,
    /// Informational role.
    pub role: String,
    /// Enrolment timestamp.
    pub created_at: DateTime<Utc>,
}

/// Query result row for ledger records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_status_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HistoryRow {
    /// Record identifier.
    pub id: uuid::Uuid,
    /// Task the record belongs to.
    pub task_id: uuid::Uuid,
    /// Origin status.
    pub from_status: Option<String>,
    /// Target status.
    pub to_status: String,
    /// Requesting member.
    pub changed_by: uuid::Uuid,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Review gate.
    pub review_type: Option<String>,
    /// Review result.
    pub review_result: Option<String>,
    /// Review feedback.
    pub review_feedback: Option<String>,
    /// Record timestamp.
    pub changed_at: DateTime<Utc>,
}

/// Insert model for ledger records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_status_history)]
pub struct NewHistoryRow {
    /// Record identifier.
    pub id: uuid::Uuid,
    /// Task the record belongs to.
    pub task_id: uuid::Uuid,
    /// Origin status.
    pub from_status: Option<String>,
    /// Target status.
    pub to_status: String,
    /// Requesting member.
    pub changed_by: uuid::Uuid,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Review gate.
    pub review_type: Option<String>,
    /// Review result.
    pub review_result: Option<String>,
    /// Review feedback.
    pub review_feedback: Option<String>,
    /// Record timestamp.
    pub changed_at: DateTime<Utc>,
}

/// Query result row for approval votes.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_status_approvals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ApprovalRow {
    /// Ledger record the vote belongs to.
    pub status_change_id: uuid::Uuid,
    /// Voting stakeholder.
    pub stakeholder_id: uuid::Uuid,
    /// Vote state.
    pub approval_status: String,
    /// Vote comment.
    pub comment: Option<String>,
    /// Enrolment timestamp.
    pub created_at: DateTime<Utc>,
    /// Resolution timestamp.
    pub approved_at: Option<DateTime<Utc>>,
}

/// Insert model for approval votes.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_status_approvals)]
pub struct NewApprovalRow {
    /// Ledger record the vote belongs to.
    pub status_change_id: uuid::Uuid,
    /// Voting stakeholder.
    pub stakeholder_id: uuid::Uuid,
    /// Vote state.
    pub approval_status: String,
    /// Vote comment.
    pub comment: Option<String>,
    /// Enrolment timestamp.
    pub created_at: DateTime<Utc>,
    /// Resolution timestamp.
    pub approved_at: Option<DateTime<Utc>>,
}

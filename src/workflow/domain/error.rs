//! Error types for workflow validation and parsing.

use super::{AllowedStatuses, MemberId, StatusChangeId, TaskId, TaskStatus};
use thiserror::Error;

/// Validation and authorisation failures raised by the transition engine.
///
/// Every variant is a local, recoverable client error: none are retried by
/// the engine itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// The actor is neither the task creator nor an admin.
    #[error("member {actor} is not the task creator or an admin")]
    NotAuthorized {
        /// The member that attempted the operation.
        actor: MemberId,
    },

    /// The requested status is not a legal successor of the current one.
    #[error("cannot transition from '{from}' to '{to}'; allowed: [{allowed}]")]
    InvalidTransition {
        /// Status the task currently holds.
        from: TaskStatus,
        /// Status that was requested.
        to: TaskStatus,
        /// Legal successors of `from`.
        allowed: AllowedStatuses,
    },

    /// A transition was requested while another one awaits approval.
    #[error("a status change is already awaiting stakeholder approval ({change_id})")]
    ApprovalInFlight {
        /// The pending ledger record.
        change_id: StatusChangeId,
    },

    /// No open ballot holds a pending vote for the member.
    #[error("no pending vote on ballot {change_id} for member {member}")]
    NoSuchBallot {
        /// The ballot that was addressed.
        change_id: StatusChangeId,
        /// The member that attempted to vote.
        member: MemberId,
    },

    /// A cancellation was attempted by someone other than the requester.
    #[error("member {member} did not request this status change (requester: {requester})")]
    NotRequester {
        /// The member that attempted the cancellation.
        member: MemberId,
        /// The member that opened the ballot.
        requester: MemberId,
    },

    /// A cancellation was attempted with no ballot open.
    #[error("task {0} has no status change awaiting approval")]
    NoOpenBallot(TaskId),

    /// The member is already a stakeholder of the task.
    #[error("member {member} is already a stakeholder of task {task_id}")]
    DuplicateStakeholder {
        /// The task the stakeholder was added to.
        task_id: TaskId,
        /// The member that was already enrolled.
        member: MemberId,
    },

    /// The member is not a stakeholder of the task.
    #[error("member {member} is not a stakeholder of task {task_id}")]
    StakeholderNotFound {
        /// The task the stakeholder was removed from.
        task_id: TaskId,
        /// The member that was not enrolled.
        member: MemberId,
    },
}

/// Error returned while parsing status-like strings from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown status value: {0}")]
pub struct ParseStatusError(pub String);

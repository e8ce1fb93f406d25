//! Append-only status-change ledger.

use super::{MemberId, ParseStatusError, ReviewType, StatusChangeId, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal result of the review attached to a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewResult {
    /// A ballot is open; the transition has not been applied.
    Pending,
    /// Every stakeholder approved and the transition was applied.
    Passed,
    /// A stakeholder rejected; the transition never happened.
    Rejected,
    /// The requester withdrew the ballot.
    Cancelled,
}

impl ReviewResult {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for ReviewResult {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "passed" => Ok(Self::Passed),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for ReviewResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied verdict for an immediately applied review transition.
///
/// Deliberately narrower than [`ReviewResult`]: `pending` belongs to the
/// engine alone, so a request can never smuggle a second open ballot into
/// the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    /// The review passed.
    Passed,
    /// The review was rejected.
    Rejected,
}

impl ReviewVerdict {
    /// Converts the verdict into its ledger representation.
    #[must_use]
    pub const fn as_result(self) -> ReviewResult {
        match self {
            Self::Passed => ReviewResult::Passed,
            Self::Rejected => ReviewResult::Rejected,
        }
    }
}

/// One entry in a task's status-change ledger.
///
/// Immutable once written except for the terminal [`ReviewResult`]
/// resolution of a pending record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeRecord {
    id: StatusChangeId,
    task_id: TaskId,
    from_status: Option<TaskStatus>,
    to_status: TaskStatus,
    changed_by: MemberId,
    comment: Option<String>,
    review_type: Option<ReviewType>,
    review_result: Option<ReviewResult>,
    review_feedback: Option<String>,
    changed_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted ledger record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecordData {
    /// Persisted record identifier.
    pub id: StatusChangeId,
    /// Persisted task reference.
    pub task_id: TaskId,
    /// Persisted origin status, `None` only for the creation record.
    pub from_status: Option<TaskStatus>,
    /// Persisted target status.
    pub to_status: TaskStatus,
    /// Persisted requesting member.
    pub changed_by: MemberId,
    /// Persisted free-text comment.
    pub comment: Option<String>,
    /// Persisted review gate.
    pub review_type: Option<ReviewType>,
    /// Persisted review result.
    pub review_result: Option<ReviewResult>,
    /// Persisted review feedback.
    pub review_feedback: Option<String>,
    /// Persisted creation timestamp.
    pub changed_at: DateTime<Utc>,
}

/// Fields shared by every freshly requested transition record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecordData {
    /// Task the record belongs to.
    pub task_id: TaskId,
    /// Status the task is leaving.
    pub from_status: TaskStatus,
    /// Status the task is moving to.
    pub to_status: TaskStatus,
    /// Member requesting the change.
    pub changed_by: MemberId,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Review gate of the status being left.
    pub review_type: Option<ReviewType>,
    /// Review feedback supplied with the request.
    pub review_feedback: Option<String>,
}

impl StatusChangeRecord {
    /// Writes the initial ledger record for a freshly created task.
    ///
    /// The creation event is never gated: `from_status` is `None` and no
    /// review fields are set.
    #[must_use]
    pub fn creation(task_id: TaskId, created_by: MemberId, now: DateTime<Utc>) -> Self {
        Self {
            id: StatusChangeId::new(),
            task_id,
            from_status: None,
            to_status: TaskStatus::Todo,
            changed_by: created_by,
            comment: Some("task created".to_owned()),
            review_type: None,
            review_result: None,
            review_feedback: None,
            changed_at: now,
        }
    }

    /// Writes a record for an immediately applied transition.
    ///
    /// `review_result` is taken directly from the caller-supplied verdict
    /// and may be `None` for a plain non-review transition.
    #[must_use]
    pub fn applied(
        data: TransitionRecordData,
        verdict: Option<ReviewVerdict>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::from_transition(data, verdict.map(ReviewVerdict::as_result), now)
    }

    /// Writes a record marking an open ballot.
    #[must_use]
    pub fn pending(data: TransitionRecordData, now: DateTime<Utc>) -> Self {
        Self::from_transition(data, Some(ReviewResult::Pending), now)
    }

    fn from_transition(
        data: TransitionRecordData,
        review_result: Option<ReviewResult>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: StatusChangeId::new(),
            task_id: data.task_id,
            from_status: Some(data.from_status),
            to_status: data.to_status,
            changed_by: data.changed_by,
            comment: data.comment,
            review_type: data.review_type,
            review_result,
            review_feedback: data.review_feedback,
            changed_at: now,
        }
    }

    /// Reconstructs a record from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedRecordData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            from_status: data.from_status,
            to_status: data.to_status,
            changed_by: data.changed_by,
            comment: data.comment,
            review_type: data.review_type,
            review_result: data.review_result,
            review_feedback: data.review_feedback,
            changed_at: data.changed_at,
        }
    }

    /// Returns the record identifier.
    #[must_use]
    pub const fn id(&self) -> StatusChangeId {
        self.id
    }

    /// Returns the task this record belongs to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the status the task left, `None` for the creation record.
    #[must_use]
    pub const fn from_status(&self) -> Option<TaskStatus> {
        self.from_status
    }

    /// Returns the status the record targets.
    #[must_use]
    pub const fn to_status(&self) -> TaskStatus {
        self.to_status
    }

    /// Returns the member that requested the change.
    #[must_use]
    pub const fn changed_by(&self) -> MemberId {
        self.changed_by
    }

    /// Returns the free-text comment, if any.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the review gate the transition crossed, if any.
    #[must_use]
    pub const fn review_type(&self) -> Option<ReviewType> {
        self.review_type
    }

    /// Returns the review result, if any.
    #[must_use]
    pub const fn review_result(&self) -> Option<ReviewResult> {
        self.review_result
    }

    /// Returns the review feedback, if any.
    #[must_use]
    pub fn review_feedback(&self) -> Option<&str> {
        self.review_feedback.as_deref()
    }

    /// Returns the record timestamp.
    #[must_use]
    pub const fn changed_at(&self) -> DateTime<Utc> {
        self.changed_at
    }

    /// Returns `true` when this record marks an open ballot.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.review_result == Some(ReviewResult::Pending)
    }

    /// Resolves a pending record to its terminal review result.
    pub const fn resolve(&mut self, result: ReviewResult) {
        self.review_result = Some(result);
    }
}

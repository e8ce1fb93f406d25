//! Task status set and the fixed transition table.

use super::ParseStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
///
/// The happy path runs `todo → task_review → in_progress → result_review →
/// done`; review statuses can bounce work back, every status can be
/// cancelled, and a cancelled task can be reactivated to `todo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task has been created but not yet submitted for review.
    Todo,
    /// Task definition is awaiting stakeholder review.
    TaskReview,
    /// Task is being worked on.
    InProgress,
    /// Task outcome is awaiting stakeholder review.
    ResultReview,
    /// Task has been completed.
    Done,
    /// Task has been cancelled.
    Cancelled,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::TaskReview => "task_review",
            Self::InProgress => "in_progress",
            Self::ResultReview => "result_review",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns the statuses this status may legally transition to.
    ///
    /// Cancellation is reachable from every status; `done` permits nothing
    /// else, and a cancelled task can only be reactivated to `todo`.
    #[must_use]
    pub const fn allowed_successors(self) -> &'static [Self] {
        match self {
            Self::Todo => &[Self::TaskReview, Self::Cancelled],
            Self::TaskReview => &[Self::Todo, Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::ResultReview, Self::Cancelled],
            Self::ResultReview => &[Self::InProgress, Self::Done, Self::Cancelled],
            Self::Done => &[Self::Cancelled],
            Self::Cancelled => &[Self::Todo],
        }
    }

    /// Returns `true` when a transition to `next` is legal.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_successors().contains(&next)
    }

    /// Returns the review gate associated with this status, if any.
    ///
    /// Used both ways: leaving a review status stamps the gate onto the
    /// ledger record, and entering one drives the review-request
    /// notification.
    #[must_use]
    pub const fn review_type(self) -> Option<ReviewType> {
        match self {
            Self::TaskReview => Some(ReviewType::TaskReview),
            Self::ResultReview => Some(ReviewType::ResultReview),
            _ => None,
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "todo" => Ok(Self::Todo),
            "task_review" => Ok(Self::TaskReview),
            "in_progress" => Ok(Self::InProgress),
            "result_review" => Ok(Self::ResultReview),
            "done" => Ok(Self::Done),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which review gate a transition crosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    /// Review of the task definition before work starts.
    TaskReview,
    /// Review of the task outcome before completion.
    ResultReview,
}

impl ReviewType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskReview => "task_review",
            Self::ResultReview => "result_review",
        }
    }
}

impl TryFrom<&str> for ReviewType {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "task_review" => Ok(Self::TaskReview),
            "result_review" => Ok(Self::ResultReview),
            _ => Err(ParseStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for ReviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display wrapper for the allowed-successor set of a status.
///
/// Carried inside [`super::WorkflowError::InvalidTransition`] so API error
/// bodies can enumerate the legal moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedStatuses(&'static [TaskStatus]);

impl AllowedStatuses {
    /// Returns the allowed-successor set of `status`.
    #[must_use]
    pub const fn of(status: TaskStatus) -> Self {
        Self(status.allowed_successors())
    }

    /// Returns the wrapped status slice.
    #[must_use]
    pub const fn as_slice(self) -> &'static [TaskStatus] {
        self.0
    }
}

impl fmt::Display for AllowedStatuses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for status in self.0 {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(status.as_str())?;
            first = false;
        }
        Ok(())
    }
}

//! Stakeholder enrolment for a task.

use super::{MemberId, ParseStatusError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Informational role of a stakeholder.
///
/// All roles carry equal voting weight; the distinction only surfaces in
/// view objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeholderRole {
    /// Default role for a member with voting rights.
    Stakeholder,
    /// Member enrolled specifically to review.
    Reviewer,
    /// Member collaborating on the task.
    Collaborator,
}

impl StakeholderRole {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stakeholder => "stakeholder",
            Self::Reviewer => "reviewer",
            Self::Collaborator => "collaborator",
        }
    }
}

impl TryFrom<&str> for StakeholderRole {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "stakeholder" => Ok(Self::Stakeholder),
            "reviewer" => Ok(Self::Reviewer),
            "collaborator" => Ok(Self::Collaborator),
            _ => Err(ParseStatusError(value.to_owned())),
        }
    }
}

impl Default for StakeholderRole {
    fn default() -> Self {
        Self::Stakeholder
    }
}

impl fmt::Display for StakeholderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member with voting rights over a task's status transitions.
///
/// Distinct from assignee and creator; a task holds at most one
/// stakeholder entry per member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeholder {
    member_id: MemberId,
    role: StakeholderRole,
    added_at: DateTime<Utc>,
}

impl Stakeholder {
    /// Enrols a member with the given role.
    #[must_use]
    pub fn new(member_id: MemberId, role: StakeholderRole, clock: &impl Clock) -> Self {
        Self {
            member_id,
            role,
            added_at: clock.utc(),
        }
    }

    /// Reconstructs a stakeholder from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        member_id: MemberId,
        role: StakeholderRole,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            member_id,
            role,
            added_at,
        }
    }

    /// Returns the enrolled member.
    #[must_use]
    pub const fn member_id(&self) -> MemberId {
        self.member_id
    }

    /// Returns the informational role.
    #[must_use]
    pub const fn role(&self) -> StakeholderRole {
        self.role
    }

    /// Returns the enrolment timestamp.
    #[must_use]
    pub const fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }
}

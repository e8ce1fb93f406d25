//! Resolved actor identity handed in by the surrounding API layer.

use super::{MemberId, Task};

/// Identity and capability flags of the member performing an operation.
///
/// The engine never resolves identity itself: authentication and the admin
/// flag come from the caller, and creator/assignee checks are derived
/// against the loaded task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    member_id: MemberId,
    is_admin: bool,
}

impl Actor {
    /// Creates a non-admin actor.
    #[must_use]
    pub const fn member(member_id: MemberId) -> Self {
        Self {
            member_id,
            is_admin: false,
        }
    }

    /// Creates an actor with the admin capability.
    #[must_use]
    pub const fn admin(member_id: MemberId) -> Self {
        Self {
            member_id,
            is_admin: true,
        }
    }

    /// Returns the acting member.
    #[must_use]
    pub const fn member_id(&self) -> MemberId {
        self.member_id
    }

    /// Returns `true` when the actor carries the admin capability.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Returns `true` when the actor created the task.
    #[must_use]
    pub fn is_creator(&self, task: &Task) -> bool {
        task.created_by() == self.member_id
    }

    /// Returns `true` when the actor is the task assignee.
    #[must_use]
    pub fn is_assignee(&self, task: &Task) -> bool {
        task.assignee() == Some(self.member_id)
    }

    /// Returns `true` when the actor may administer the task.
    ///
    /// Creator and admin are the only roles allowed to change status,
    /// manage stakeholders, or delete the task.
    #[must_use]
    pub fn can_administer(&self, task: &Task) -> bool {
        self.is_admin || self.is_creator(task)
    }
}

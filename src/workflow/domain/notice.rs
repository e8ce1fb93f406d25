//! Fan-out notification payloads emitted by the engine.

use super::{MemberId, ReviewType, StatusChangeId, Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoticeKind {
    /// The recipient was enrolled as a stakeholder.
    StakeholderAdded,
    /// The recipient was assigned the task.
    TaskAssigned,
    /// A status change awaits the recipient's approval.
    ApprovalRequested {
        /// Status the task would leave.
        from: TaskStatus,
        /// Status the task would move to.
        to: TaskStatus,
    },
    /// The task entered a review status and awaits the recipient's review.
    ReviewRequested {
        /// Which review gate was entered.
        review_type: ReviewType,
    },
    /// The task status changed.
    StatusChanged {
        /// Status the task left.
        from: TaskStatus,
        /// Status the task now holds.
        to: TaskStatus,
    },
    /// A stakeholder rejected the recipient's status-change request.
    ApprovalRejected {
        /// The rejected ledger record.
        change_id: StatusChangeId,
    },
    /// The requester withdrew a status-change request.
    ApprovalCancelled {
        /// The cancelled ledger record.
        change_id: StatusChangeId,
    },
    /// The recipient was mentioned with an `@name` token.
    Mentioned,
}

/// One fan-out notification: a set of recipients and an event payload.
///
/// Dispatch is fire-and-forget; the engine drops the sender from the
/// recipient set before handing the notice to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    sender: MemberId,
    recipients: BTreeSet<MemberId>,
    task_id: TaskId,
    task_title: String,
    kind: NoticeKind,
}

impl Notice {
    /// Creates a notice about `task` for the given recipients.
    #[must_use]
    pub fn new(
        sender: MemberId,
        task: &Task,
        recipients: BTreeSet<MemberId>,
        kind: NoticeKind,
    ) -> Self {
        Self {
            sender,
            recipients,
            task_id: task.id(),
            task_title: task.title().to_owned(),
            kind,
        }
    }

    /// Returns the member the notice originates from.
    #[must_use]
    pub const fn sender(&self) -> MemberId {
        self.sender
    }

    /// Returns the recipient set.
    #[must_use]
    pub const fn recipients(&self) -> &BTreeSet<MemberId> {
        &self.recipients
    }

    /// Returns the task the notice refers to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the task title at the time the notice was created.
    #[must_use]
    pub fn task_title(&self) -> &str {
        &self.task_title
    }

    /// Returns the event payload.
    #[must_use]
    pub const fn kind(&self) -> &NoticeKind {
        &self.kind
    }

    /// Removes the sender from the recipient set.
    ///
    /// Members are never notified about their own actions.
    pub fn drop_sender(&mut self) {
        self.recipients.remove(&self.sender);
    }
}

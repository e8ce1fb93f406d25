//! Domain model for the task status transition and stakeholder-approval
//! workflow.
//!
//! Pure business logic: the status state machine, the append-only ledger,
//! ballots with all-or-nothing voting semantics, and the snapshot planner
//! that turns a request into a single atomic write-set. No infrastructure
//! concerns cross this boundary.

mod actor;
mod ballot;
mod error;
mod history;
mod ids;
mod notice;
mod snapshot;
mod stakeholder;
mod status;
mod task;

pub use actor::Actor;
pub use ballot::{ApprovalVote, Ballot, VoteAction, VoteState};
pub use error::{ParseStatusError, WorkflowError};
pub use history::{
    PersistedRecordData, ReviewResult, ReviewVerdict, StatusChangeRecord, TransitionRecordData,
};
pub use ids::{MemberId, ProjectId, StatusChangeId, TaskId};
pub use notice::{Notice, NoticeKind};
pub use snapshot::{
    PendingApproval, TransitionOutcome, TransitionRequest, VoteOutcome, WorkflowMutation,
    WorkflowSnapshot, WorkflowStep,
};
pub use stakeholder::{Stakeholder, StakeholderRole};
pub use status::{AllowedStatuses, ReviewType, TaskStatus};
pub use task::{PersistedTaskData, Task};

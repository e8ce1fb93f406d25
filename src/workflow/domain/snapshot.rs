//! Versioned workflow snapshot and transition planning.
//!
//! A snapshot is everything the engine needs to decide one operation: the
//! task row, the stakeholder set, and the open ballot if one exists.
//! Planning is pure: each `plan_*` method validates against the snapshot
//! and describes the writes as a [`WorkflowMutation`], which the repository
//! commits atomically under the snapshot's version.

use super::{
    Actor, AllowedStatuses, ApprovalVote, Ballot, MemberId, Notice, NoticeKind, ReviewResult,
    ReviewVerdict, Stakeholder, StakeholderRole, StatusChangeId, StatusChangeRecord, Task,
    TaskStatus, TransitionRecordData, VoteAction, WorkflowError,
};
use mockable::Clock;
use std::collections::BTreeSet;

/// A pending status change and its ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingApproval {
    record: StatusChangeRecord,
    ballot: Ballot,
}

impl PendingApproval {
    /// Pairs a pending ledger record with its ballot.
    #[must_use]
    pub const fn new(record: StatusChangeRecord, ballot: Ballot) -> Self {
        Self { record, ballot }
    }

    /// Returns the pending ledger record.
    #[must_use]
    pub const fn record(&self) -> &StatusChangeRecord {
        &self.record
    }

    /// Returns the ballot.
    #[must_use]
    pub const fn ballot(&self) -> &Ballot {
        &self.ballot
    }
}

/// Versioned view of one task's workflow state.
///
/// The version is bumped by every committed mutation; a commit against a
/// stale version fails and the caller re-plans against a fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    version: i64,
    task: Task,
    stakeholders: Vec<Stakeholder>,
    pending: Option<PendingApproval>,
}

/// Write-set of one planned workflow operation.
///
/// Committed atomically by the repository; the variants enumerate every
/// state change the engine can make after task creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowMutation {
    /// Apply a transition immediately and append its ledger record.
    ApplyTransition {
        /// Task with the new status applied.
        task: Task,
        /// Ledger record of the applied transition.
        record: StatusChangeRecord,
    },
    /// Open a ballot: append the pending record and its votes.
    OpenBallot {
        /// Pending ledger record.
        record: StatusChangeRecord,
        /// Freshly opened ballot.
        ballot: Ballot,
    },
    /// Store one approving vote that does not yet resolve the ballot.
    RecordVote {
        /// Ballot the vote belongs to.
        change_id: StatusChangeId,
        /// The cast vote.
        vote: ApprovalVote,
    },
    /// Store a rejecting vote and close the ballot as rejected.
    CloseBallotRejected {
        /// Ballot the vote belongs to.
        change_id: StatusChangeId,
        /// The cast vote.
        vote: ApprovalVote,
        /// Ledger record resolved to `rejected`.
        record: StatusChangeRecord,
    },
    /// Store the final approving vote, close the ballot as passed, and
    /// apply the deferred transition.
    ResolveBallot {
        /// Ballot the vote belongs to.
        change_id: StatusChangeId,
        /// The cast vote.
        vote: ApprovalVote,
        /// Ledger record resolved to `passed`.
        record: StatusChangeRecord,
        /// Task with the deferred status applied.
        task: Task,
    },
    /// Close the ballot as cancelled and delete its votes.
    CancelBallot {
        /// Ballot being withdrawn.
        change_id: StatusChangeId,
        /// Ledger record resolved to `cancelled`.
        record: StatusChangeRecord,
    },
    /// Enrol a stakeholder.
    AddStakeholder {
        /// The new stakeholder.
        stakeholder: Stakeholder,
    },
    /// Remove a stakeholder.
    RemoveStakeholder {
        /// The member being removed.
        member_id: MemberId,
    },
}

/// A planned operation: the writes, the caller-facing outcome, and the
/// notifications to fan out after the commit succeeds.
#[derive(Debug, Clone)]
pub struct WorkflowStep<O> {
    /// Write-set to commit.
    pub mutation: WorkflowMutation,
    /// Outcome returned to the caller once committed.
    pub outcome: O,
    /// Notifications to dispatch post-commit.
    pub notices: Vec<Notice>,
}

/// Request payload for a status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    new_status: TaskStatus,
    comment: Option<String>,
    review_verdict: Option<ReviewVerdict>,
    review_feedback: Option<String>,
}

impl TransitionRequest {
    /// Creates a request targeting `new_status`.
    #[must_use]
    pub const fn to(new_status: TaskStatus) -> Self {
        Self {
            new_status,
            comment: None,
            review_verdict: None,
            review_feedback: None,
        }
    }

    /// Sets the free-text comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the review verdict recorded with an immediately applied
    /// transition.
    #[must_use]
    pub const fn with_verdict(mut self, verdict: ReviewVerdict) -> Self {
        self.review_verdict = Some(verdict);
        self
    }

    /// Sets the review feedback.
    #[must_use]
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.review_feedback = Some(feedback.into());
        self
    }

    /// Returns the requested status.
    #[must_use]
    pub const fn new_status(&self) -> TaskStatus {
        self.new_status
    }

    /// Returns the comment, if any.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the review verdict, if any.
    #[must_use]
    pub const fn review_verdict(&self) -> Option<ReviewVerdict> {
        self.review_verdict
    }

    /// Returns the review feedback, if any.
    #[must_use]
    pub fn review_feedback(&self) -> Option<&str> {
        self.review_feedback.as_deref()
    }
}

/// Outcome of a transition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was applied immediately.
    Applied {
        /// Task with the new status.
        task: Task,
        /// Ledger record of the transition.
        record: StatusChangeRecord,
    },
    /// A ballot was opened; the task status is unchanged.
    AwaitingApproval {
        /// Pending ledger record.
        record: StatusChangeRecord,
        /// Stakeholders enrolled to vote.
        voters: BTreeSet<MemberId>,
    },
}

/// Outcome of casting a vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Vote stored; the ballot stays open.
    AwaitingMoreVotes {
        /// Number of votes still pending.
        outstanding: usize,
    },
    /// The ballot closed as rejected; the task status is unchanged.
    Rejected {
        /// Ledger record resolved to `rejected`.
        record: StatusChangeRecord,
    },
    /// Unanimous approval; the deferred transition was applied.
    Resolved {
        /// Task with the deferred status applied.
        task: Task,
        /// Ledger record resolved to `passed`.
        record: StatusChangeRecord,
    },
}

impl WorkflowSnapshot {
    /// Builds a snapshot from loaded state.
    #[must_use]
    pub const fn new(
        version: i64,
        task: Task,
        stakeholders: Vec<Stakeholder>,
        pending: Option<PendingApproval>,
    ) -> Self {
        Self {
            version,
            task,
            stakeholders,
            pending,
        }
    }

    /// Returns the snapshot version.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// Returns the task.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Returns the stakeholder set.
    #[must_use]
    pub fn stakeholders(&self) -> &[Stakeholder] {
        &self.stakeholders
    }

    /// Returns the open ballot and its record, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<&PendingApproval> {
        self.pending.as_ref()
    }

    /// Returns `true` when the member is a stakeholder of the task.
    #[must_use]
    pub fn is_stakeholder(&self, member: MemberId) -> bool {
        self.stakeholders
            .iter()
            .any(|stakeholder| stakeholder.member_id() == member)
    }

    /// Returns the deduplicated {assignee, creator, stakeholders} set.
    #[must_use]
    pub fn notify_set(&self) -> BTreeSet<MemberId> {
        let mut set: BTreeSet<MemberId> = self
            .stakeholders
            .iter()
            .map(Stakeholder::member_id)
            .collect();
        set.insert(self.task.created_by());
        if let Some(assignee) = self.task.assignee() {
            set.insert(assignee);
        }
        set
    }

    /// Fails unless the actor may administer the task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotAuthorized`] when the actor is neither
    /// the creator nor an admin.
    pub fn ensure_administered_by(&self, actor: &Actor) -> Result<(), WorkflowError> {
        if actor.can_administer(&self.task) {
            return Ok(());
        }
        Err(WorkflowError::NotAuthorized {
            actor: actor.member_id(),
        })
    }

    /// Plans a status transition request.
    ///
    /// Approval is needed iff the actor is the creator, the stakeholder
    /// set minus the actor is non-empty, and the target is not
    /// `cancelled`. Cancellation is always immediate so an abandoned task
    /// never deadlocks behind unreachable approvers, and non-creator
    /// admins bypass approval entirely as an administrative escape hatch.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotAuthorized`] for actors without the
    /// creator or admin capability, [`WorkflowError::ApprovalInFlight`]
    /// when a ballot is already open, and
    /// [`WorkflowError::InvalidTransition`] when the target status is not a
    /// legal successor.
    pub fn plan_transition(
        &self,
        actor: &Actor,
        request: &TransitionRequest,
        clock: &impl Clock,
    ) -> Result<WorkflowStep<TransitionOutcome>, WorkflowError> {
        self.ensure_administered_by(actor)?;
        if let Some(pending) = &self.pending {
            return Err(WorkflowError::ApprovalInFlight {
                change_id: pending.record.id(),
            });
        }
        let from = self.task.status();
        let to = request.new_status();
        if !from.can_transition_to(to) {
            return Err(WorkflowError::InvalidTransition {
                from,
                to,
                allowed: AllowedStatuses::of(from),
            });
        }

        let voters: BTreeSet<MemberId> = self
            .stakeholders
            .iter()
            .map(Stakeholder::member_id)
            .filter(|member| *member != actor.member_id())
            .collect();
        let needs_approval =
            actor.is_creator(&self.task) && !voters.is_empty() && to != TaskStatus::Cancelled;

        let data = TransitionRecordData {
            task_id: self.task.id(),
            from_status: from,
            to_status: to,
            changed_by: actor.member_id(),
            comment: request.comment().map(ToOwned::to_owned),
            review_type: from.review_type(),
            review_feedback: request.review_feedback().map(ToOwned::to_owned),
        };

        if needs_approval {
            Ok(self.plan_gated(actor, data, voters, clock))
        } else {
            self.plan_immediate(actor, data, request.review_verdict(), clock)
        }
    }

    /// Opens a ballot for the transition without touching the task.
    fn plan_gated(
        &self,
        actor: &Actor,
        data: TransitionRecordData,
        voters: BTreeSet<MemberId>,
        clock: &impl Clock,
    ) -> WorkflowStep<TransitionOutcome> {
        let now = clock.utc();
        let (from, to) = (data.from_status, data.to_status);
        let record = StatusChangeRecord::pending(data, now);
        let ballot = Ballot::open(record.id(), voters.iter().copied(), now);
        let notices = vec![Notice::new(
            actor.member_id(),
            &self.task,
            voters.clone(),
            NoticeKind::ApprovalRequested { from, to },
        )];
        WorkflowStep {
            mutation: WorkflowMutation::OpenBallot {
                record: record.clone(),
                ballot,
            },
            outcome: TransitionOutcome::AwaitingApproval { record, voters },
            notices,
        }
    }

    /// Applies the transition in place.
    fn plan_immediate(
        &self,
        actor: &Actor,
        data: TransitionRecordData,
        verdict: Option<ReviewVerdict>,
        clock: &impl Clock,
    ) -> Result<WorkflowStep<TransitionOutcome>, WorkflowError> {
        let now = clock.utc();
        let (from, to) = (data.from_status, data.to_status);
        let mut task = self.task.clone();
        task.apply_status(to, clock)?;
        let record = StatusChangeRecord::applied(data, verdict, now);
        let kind = to.review_type().map_or(
            NoticeKind::StatusChanged { from, to },
            |review_type| NoticeKind::ReviewRequested { review_type },
        );
        let notices = vec![Notice::new(
            actor.member_id(),
            &task,
            self.notify_set(),
            kind,
        )];
        Ok(WorkflowStep {
            mutation: WorkflowMutation::ApplyTransition {
                task: task.clone(),
                record: record.clone(),
            },
            outcome: TransitionOutcome::Applied { task, record },
            notices,
        })
    }

    /// Plans a stakeholder's vote on the open ballot.
    ///
    /// A rejection closes the ballot immediately; an approval resolves the
    /// ballot only when the full, freshly loaded vote set is unanimous.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NoSuchBallot`] when no open ballot matches
    /// `change_id` or the member holds no pending vote on it.
    pub fn plan_vote(
        &self,
        change_id: StatusChangeId,
        voter: MemberId,
        action: VoteAction,
        comment: Option<String>,
        clock: &impl Clock,
    ) -> Result<WorkflowStep<VoteOutcome>, WorkflowError> {
        let pending = self
            .pending
            .as_ref()
            .filter(|pending| pending.record.id() == change_id)
            .ok_or(WorkflowError::NoSuchBallot {
                change_id,
                member: voter,
            })?;
        let now = clock.utc();
        let mut ballot = pending.ballot.clone();
        let vote = ballot.cast(voter, action, comment, now)?;

        match action {
            VoteAction::Reject => Ok(self.plan_rejection(pending, change_id, vote, voter)),
            VoteAction::Approve if ballot.all_approved() => {
                self.plan_resolution(pending, change_id, vote, clock)
            }
            VoteAction::Approve => Ok(WorkflowStep {
                mutation: WorkflowMutation::RecordVote { change_id, vote },
                outcome: VoteOutcome::AwaitingMoreVotes {
                    outstanding: ballot.outstanding(),
                },
                notices: Vec::new(),
            }),
        }
    }

    /// Closes the ballot as rejected; the deferred transition never
    /// happens.
    fn plan_rejection(
        &self,
        pending: &PendingApproval,
        change_id: StatusChangeId,
        vote: ApprovalVote,
        voter: MemberId,
    ) -> WorkflowStep<VoteOutcome> {
        let mut record = pending.record.clone();
        record.resolve(ReviewResult::Rejected);
        let notices = vec![Notice::new(
            voter,
            &self.task,
            BTreeSet::from([record.changed_by()]),
            NoticeKind::ApprovalRejected { change_id },
        )];
        WorkflowStep {
            mutation: WorkflowMutation::CloseBallotRejected {
                change_id,
                vote,
                record: record.clone(),
            },
            outcome: VoteOutcome::Rejected { record },
            notices,
        }
    }

    /// Applies the deferred transition after unanimous approval.
    fn plan_resolution(
        &self,
        pending: &PendingApproval,
        change_id: StatusChangeId,
        vote: ApprovalVote,
        clock: &impl Clock,
    ) -> Result<WorkflowStep<VoteOutcome>, WorkflowError> {
        let mut record = pending.record.clone();
        record.resolve(ReviewResult::Passed);
        let from = self.task.status();
        let to = record.to_status();
        let mut task = self.task.clone();
        task.apply_status(to, clock)?;
        // The requester is the sender: recipients learn whose change landed.
        let notices = vec![Notice::new(
            record.changed_by(),
            &task,
            self.notify_set(),
            NoticeKind::StatusChanged { from, to },
        )];
        Ok(WorkflowStep {
            mutation: WorkflowMutation::ResolveBallot {
                change_id,
                vote,
                record: record.clone(),
                task: task.clone(),
            },
            outcome: VoteOutcome::Resolved { task, record },
            notices,
        })
    }

    /// Plans the withdrawal of the open ballot.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NoOpenBallot`] when nothing is pending and
    /// [`WorkflowError::NotRequester`] when the actor did not open the
    /// ballot.
    pub fn plan_cancellation(
        &self,
        actor: MemberId,
    ) -> Result<WorkflowStep<StatusChangeRecord>, WorkflowError> {
        let pending = self
            .pending
            .as_ref()
            .ok_or(WorkflowError::NoOpenBallot(self.task.id()))?;
        let requester = pending.record.changed_by();
        if requester != actor {
            return Err(WorkflowError::NotRequester {
                member: actor,
                requester,
            });
        }
        let mut record = pending.record.clone();
        record.resolve(ReviewResult::Cancelled);
        let notices = vec![Notice::new(
            actor,
            &self.task,
            pending.ballot.voters(),
            NoticeKind::ApprovalCancelled {
                change_id: record.id(),
            },
        )];
        Ok(WorkflowStep {
            mutation: WorkflowMutation::CancelBallot {
                change_id: record.id(),
                record: record.clone(),
            },
            outcome: record,
            notices,
        })
    }

    /// Plans the enrolment of a new stakeholder.
    ///
    /// Open ballots are unaffected: the vote set was fixed when the ballot
    /// opened.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotAuthorized`] for actors without the
    /// creator or admin capability and
    /// [`WorkflowError::DuplicateStakeholder`] when the member is already
    /// enrolled.
    pub fn plan_stakeholder_addition(
        &self,
        actor: &Actor,
        member: MemberId,
        role: StakeholderRole,
        clock: &impl Clock,
    ) -> Result<WorkflowStep<Stakeholder>, WorkflowError> {
        self.ensure_administered_by(actor)?;
        if self.is_stakeholder(member) {
            return Err(WorkflowError::DuplicateStakeholder {
                task_id: self.task.id(),
                member,
            });
        }
        let stakeholder = Stakeholder::new(member, role, clock);
        let notices = vec![Notice::new(
            actor.member_id(),
            &self.task,
            BTreeSet::from([member]),
            NoticeKind::StakeholderAdded,
        )];
        Ok(WorkflowStep {
            mutation: WorkflowMutation::AddStakeholder {
                stakeholder: stakeholder.clone(),
            },
            outcome: stakeholder,
            notices,
        })
    }

    /// Plans the removal of a stakeholder.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotAuthorized`] for actors without the
    /// creator or admin capability and
    /// [`WorkflowError::StakeholderNotFound`] when the member is not
    /// enrolled.
    pub fn plan_stakeholder_removal(
        &self,
        actor: &Actor,
        member: MemberId,
    ) -> Result<WorkflowStep<()>, WorkflowError> {
        self.ensure_administered_by(actor)?;
        if !self.is_stakeholder(member) {
            return Err(WorkflowError::StakeholderNotFound {
                task_id: self.task.id(),
                member,
            });
        }
        Ok(WorkflowStep {
            mutation: WorkflowMutation::RemoveStakeholder { member_id: member },
            outcome: (),
            notices: Vec::new(),
        })
    }
}

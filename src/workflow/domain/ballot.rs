//! Per-stakeholder approval votes for one pending status change.

use super::{MemberId, StatusChangeId, WorkflowError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// State of a single stakeholder's vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteState {
    /// Vote has not been cast yet.
    Pending,
    /// Stakeholder approved the change.
    Approved,
    /// Stakeholder rejected the change.
    Rejected,
}

impl VoteState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for VoteState {
    type Error = super::ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(super::ParseStatusError(value.to_owned())),
        }
    }
}

/// Action a stakeholder takes on an open ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteAction {
    /// Approve the pending change.
    Approve,
    /// Reject the pending change.
    Reject,
}

/// One stakeholder's vote on a pending status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalVote {
    stakeholder_id: MemberId,
    state: VoteState,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl ApprovalVote {
    /// Creates an uncast vote for a stakeholder.
    #[must_use]
    pub const fn pending(stakeholder_id: MemberId, now: DateTime<Utc>) -> Self {
        Self {
            stakeholder_id,
            state: VoteState::Pending,
            comment: None,
            created_at: now,
            resolved_at: None,
        }
    }

    /// Reconstructs a vote from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        stakeholder_id: MemberId,
        state: VoteState,
        comment: Option<String>,
        created_at: DateTime<Utc>,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            stakeholder_id,
            state,
            comment,
            created_at,
            resolved_at,
        }
    }

    /// Returns the voting stakeholder.
    #[must_use]
    pub const fn stakeholder_id(&self) -> MemberId {
        self.stakeholder_id
    }

    /// Returns the vote state.
    #[must_use]
    pub const fn state(&self) -> VoteState {
        self.state
    }

    /// Returns the vote comment, if any.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the enrolment timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the resolution timestamp, if the vote has been cast.
    #[must_use]
    pub const fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    fn cast(&mut self, action: VoteAction, comment: Option<String>, now: DateTime<Utc>) {
        self.state = match action {
            VoteAction::Approve => VoteState::Approved,
            VoteAction::Reject => VoteState::Rejected,
        };
        self.comment = comment;
        self.resolved_at = Some(now);
    }
}

/// The vote set of one open status-change record.
///
/// The set is fixed when the ballot opens: stakeholders added to the task
/// afterwards are not retroactively enrolled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    change_id: StatusChangeId,
    votes: BTreeMap<MemberId, ApprovalVote>,
}

impl Ballot {
    /// Opens a ballot with one pending vote per enrolled voter.
    #[must_use]
    pub fn open(
        change_id: StatusChangeId,
        voters: impl IntoIterator<Item = MemberId>,
        now: DateTime<Utc>,
    ) -> Self {
        let votes = voters
            .into_iter()
            .map(|member| (member, ApprovalVote::pending(member, now)))
            .collect();
        Self { change_id, votes }
    }

    /// Reconstructs a ballot from persisted votes.
    #[must_use]
    pub fn from_persisted(
        change_id: StatusChangeId,
        votes: impl IntoIterator<Item = ApprovalVote>,
    ) -> Self {
        let votes = votes
            .into_iter()
            .map(|vote| (vote.stakeholder_id(), vote))
            .collect();
        Self { change_id, votes }
    }

    /// Returns the pending record this ballot belongs to.
    #[must_use]
    pub const fn change_id(&self) -> StatusChangeId {
        self.change_id
    }

    /// Returns the vote set keyed by stakeholder.
    #[must_use]
    pub const fn votes(&self) -> &BTreeMap<MemberId, ApprovalVote> {
        &self.votes
    }

    /// Returns the enrolled voters.
    #[must_use]
    pub fn voters(&self) -> BTreeSet<MemberId> {
        self.votes.keys().copied().collect()
    }

    /// Returns `true` when no voter is enrolled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Casts a stakeholder's vote and returns the updated vote.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NoSuchBallot`] when the member holds no
    /// pending vote on this ballot.
    pub fn cast(
        &mut self,
        member: MemberId,
        action: VoteAction,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalVote, WorkflowError> {
        let vote = self
            .votes
            .get_mut(&member)
            .filter(|vote| vote.state() == VoteState::Pending)
            .ok_or(WorkflowError::NoSuchBallot {
                change_id: self.change_id,
                member,
            })?;
        vote.cast(action, comment, now);
        Ok(vote.clone())
    }

    /// Overwrites the stored vote for the vote's stakeholder.
    ///
    /// Adapter support for replaying a committed vote into a stored ballot.
    pub fn record(&mut self, vote: ApprovalVote) {
        self.votes.insert(vote.stakeholder_id(), vote);
    }

    /// Returns `true` when every enrolled vote is `approved`.
    ///
    /// Always re-aggregates over the full vote set; there is no cached
    /// tally to fall out of date under concurrent voting.
    #[must_use]
    pub fn all_approved(&self) -> bool {
        self.votes
            .values()
            .all(|vote| vote.state() == VoteState::Approved)
    }

    /// Returns the number of votes still pending.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.votes
            .values()
            .filter(|vote| vote.state() == VoteState::Pending)
            .count()
    }
}

//! Unit tests for snapshot planning: approval gating, voting, cancellation.

use crate::workflow::domain::{
    Actor, AllowedStatuses, Ballot, MemberId, NoticeKind, PendingApproval, PersistedTaskData,
    ProjectId, ReviewResult, ReviewType, ReviewVerdict, Stakeholder, StakeholderRole,
    StatusChangeRecord, Task, TaskId, TaskStatus, TransitionOutcome, TransitionRecordData,
    TransitionRequest, VoteAction, VoteOutcome, WorkflowError, WorkflowMutation, WorkflowSnapshot,
};
use chrono::Utc;
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use std::collections::BTreeSet;

#[fixture]
fn clock() -> DefaultClock {
    DefaultClock
}

fn task_at(status: TaskStatus, creator: MemberId) -> Task {
    let now = Utc::now();
    Task::from_persisted(PersistedTaskData {
        id: TaskId::new(),
        project_id: ProjectId::new(),
        title: "Ship the importer".to_owned(),
        description: None,
        assignee: None,
        created_by: creator,
        status,
        completed_at: (status == TaskStatus::Done).then_some(now),
        created_at: now,
        updated_at: now,
    })
}

fn stakeholders_of(members: &[MemberId], clock: &DefaultClock) -> Vec<Stakeholder> {
    members
        .iter()
        .map(|member| Stakeholder::new(*member, StakeholderRole::Stakeholder, clock))
        .collect()
}

fn snapshot(task: Task, stakeholders: Vec<Stakeholder>) -> WorkflowSnapshot {
    WorkflowSnapshot::new(1, task, stakeholders, None)
}

fn snapshot_with_ballot(
    task: Task,
    stakeholders: Vec<Stakeholder>,
    requester: MemberId,
    to_status: TaskStatus,
    voters: &[MemberId],
) -> (WorkflowSnapshot, StatusChangeRecord) {
    let now = Utc::now();
    let record = StatusChangeRecord::pending(
        TransitionRecordData {
            task_id: task.id(),
            from_status: task.status(),
            to_status,
            changed_by: requester,
            comment: None,
            review_type: task.status().review_type(),
            review_feedback: None,
        },
        now,
    );
    let ballot = Ballot::open(record.id(), voters.iter().copied(), now);
    let pending = PendingApproval::new(record.clone(), ballot);
    (
        WorkflowSnapshot::new(2, task, stakeholders, Some(pending)),
        record,
    )
}

#[rstest]
fn transition_requires_creator_or_admin(clock: DefaultClock) {
    let creator = MemberId::new();
    let outsider = MemberId::new();
    let state = snapshot(task_at(TaskStatus::Todo, creator), Vec::new());

    let result = state.plan_transition(
        &Actor::member(outsider),
        &TransitionRequest::to(TaskStatus::TaskReview),
        &clock,
    );

    assert!(matches!(
        result,
        Err(WorkflowError::NotAuthorized { actor }) if actor == outsider
    ));
}

#[rstest]
fn illegal_target_is_rejected_with_allowed_set(clock: DefaultClock) {
    let creator = MemberId::new();
    let state = snapshot(task_at(TaskStatus::Todo, creator), Vec::new());

    let result = state.plan_transition(
        &Actor::member(creator),
        &TransitionRequest::to(TaskStatus::Done),
        &clock,
    );

    assert_eq!(
        result.err(),
        Some(WorkflowError::InvalidTransition {
            from: TaskStatus::Todo,
            to: TaskStatus::Done,
            allowed: AllowedStatuses::of(TaskStatus::Todo),
        })
    );
}

#[rstest]
fn open_ballot_blocks_new_requests(clock: DefaultClock) {
    let creator = MemberId::new();
    let voter = MemberId::new();
    let task = task_at(TaskStatus::Todo, creator);
    let enrolled = stakeholders_of(&[voter], &clock);
    let (state, record) =
        snapshot_with_ballot(task, enrolled, creator, TaskStatus::TaskReview, &[voter]);

    let result = state.plan_transition(
        &Actor::member(creator),
        &TransitionRequest::to(TaskStatus::Cancelled),
        &clock,
    );

    assert!(matches!(
        result,
        Err(WorkflowError::ApprovalInFlight { change_id }) if change_id == record.id()
    ));
}

#[rstest]
fn creator_with_stakeholders_defers_behind_ballot(clock: DefaultClock) {
    let creator = MemberId::new();
    let voters = [MemberId::new(), MemberId::new()];
    let task = task_at(TaskStatus::Todo, creator);
    let state = snapshot(task, stakeholders_of(&voters, &clock));

    let step = state
        .plan_transition(
            &Actor::member(creator),
            &TransitionRequest::to(TaskStatus::TaskReview).with_comment("please review"),
            &clock,
        )
        .expect("gated transition plans");

    let TransitionOutcome::AwaitingApproval { record, voters: enrolled } = step.outcome else {
        panic!("expected a deferred outcome");
    };
    assert!(record.is_pending());
    assert_eq!(record.from_status(), Some(TaskStatus::Todo));
    assert_eq!(record.to_status(), TaskStatus::TaskReview);
    assert_eq!(enrolled, voters.iter().copied().collect::<BTreeSet<_>>());
    assert!(matches!(
        step.mutation,
        WorkflowMutation::OpenBallot { ref ballot, .. } if ballot.voters() == enrolled
    ));

    let notice = step.notices.first().expect("approval request notice");
    assert_eq!(notice.recipients(), &enrolled);
    assert!(matches!(
        notice.kind(),
        NoticeKind::ApprovalRequested {
            from: TaskStatus::Todo,
            to: TaskStatus::TaskReview,
        }
    ));
}

#[rstest]
fn sole_stakeholder_actor_applies_immediately(clock: DefaultClock) {
    let creator = MemberId::new();
    let task = task_at(TaskStatus::Todo, creator);
    let state = snapshot(task, stakeholders_of(&[creator], &clock));

    let step = state
        .plan_transition(
            &Actor::member(creator),
            &TransitionRequest::to(TaskStatus::TaskReview),
            &clock,
        )
        .expect("transition plans");

    assert!(matches!(step.outcome, TransitionOutcome::Applied { .. }));
}

#[rstest]
fn admin_bypasses_ballot(clock: DefaultClock) {
    let creator = MemberId::new();
    let admin = MemberId::new();
    let voters = [MemberId::new(), MemberId::new()];
    let task = task_at(TaskStatus::InProgress, creator);
    let state = snapshot(task, stakeholders_of(&voters, &clock));

    let step = state
        .plan_transition(
            &Actor::admin(admin),
            &TransitionRequest::to(TaskStatus::ResultReview),
            &clock,
        )
        .expect("admin transition plans");

    let TransitionOutcome::Applied { task, .. } = step.outcome else {
        panic!("expected an immediate outcome");
    };
    assert_eq!(task.status(), TaskStatus::ResultReview);
}

#[rstest]
fn cancellation_is_always_immediate(clock: DefaultClock) {
    let creator = MemberId::new();
    let voters = [MemberId::new(), MemberId::new()];
    let task = task_at(TaskStatus::InProgress, creator);
    let state = snapshot(task, stakeholders_of(&voters, &clock));

    let step = state
        .plan_transition(
            &Actor::member(creator),
            &TransitionRequest::to(TaskStatus::Cancelled),
            &clock,
        )
        .expect("cancellation plans");

    let TransitionOutcome::Applied { task, .. } = step.outcome else {
        panic!("expected an immediate outcome");
    };
    assert_eq!(task.status(), TaskStatus::Cancelled);
}

#[rstest]
fn review_gate_and_verdict_are_recorded(clock: DefaultClock) {
    let creator = MemberId::new();
    let task = task_at(TaskStatus::TaskReview, creator);
    let state = snapshot(task, Vec::new());

    let step = state
        .plan_transition(
            &Actor::member(creator),
            &TransitionRequest::to(TaskStatus::InProgress)
                .with_verdict(ReviewVerdict::Passed)
                .with_feedback("looks solid"),
            &clock,
        )
        .expect("review transition plans");

    let TransitionOutcome::Applied { record, .. } = step.outcome else {
        panic!("expected an immediate outcome");
    };
    assert_eq!(record.review_type(), Some(ReviewType::TaskReview));
    assert_eq!(record.review_result(), Some(ReviewResult::Passed));
    assert_eq!(record.review_feedback(), Some("looks solid"));
}

#[rstest]
fn entering_review_notifies_reviewers(clock: DefaultClock) {
    let creator = MemberId::new();
    let task = task_at(TaskStatus::Todo, creator);
    let state = snapshot(task, Vec::new());

    let step = state
        .plan_transition(
            &Actor::admin(MemberId::new()),
            &TransitionRequest::to(TaskStatus::TaskReview),
            &clock,
        )
        .expect("transition plans");

    let notice = step.notices.first().expect("review request notice");
    assert!(matches!(
        notice.kind(),
        NoticeKind::ReviewRequested {
            review_type: ReviewType::TaskReview,
        }
    ));
    assert!(notice.recipients().contains(&creator));
}

#[rstest]
fn completion_stamps_completed_at(clock: DefaultClock) {
    let creator = MemberId::new();
    let state = snapshot(task_at(TaskStatus::ResultReview, creator), Vec::new());

    let step = state
        .plan_transition(
            &Actor::member(creator),
            &TransitionRequest::to(TaskStatus::Done),
            &clock,
        )
        .expect("completion plans");

    let TransitionOutcome::Applied { task, .. } = step.outcome else {
        panic!("expected an immediate outcome");
    };
    assert!(task.completed_at().is_some());
}

#[rstest]
fn cancelling_done_clears_completed_at(clock: DefaultClock) {
    let creator = MemberId::new();
    let state = snapshot(task_at(TaskStatus::Done, creator), Vec::new());

    let step = state
        .plan_transition(
            &Actor::member(creator),
            &TransitionRequest::to(TaskStatus::Cancelled),
            &clock,
        )
        .expect("cancellation plans");

    let TransitionOutcome::Applied { task, .. } = step.outcome else {
        panic!("expected an immediate outcome");
    };
    assert_eq!(task.status(), TaskStatus::Cancelled);
    assert!(task.completed_at().is_none());
}

#[rstest]
fn partial_approval_keeps_the_ballot_open(clock: DefaultClock) {
    let creator = MemberId::new();
    let voters = [MemberId::new(), MemberId::new()];
    let task = task_at(TaskStatus::Todo, creator);
    let enrolled = stakeholders_of(&voters, &clock);
    let (state, record) =
        snapshot_with_ballot(task, enrolled, creator, TaskStatus::TaskReview, &voters);

    let step = state
        .plan_vote(
            record.id(),
            voters[0],
            VoteAction::Approve,
            None,
            &clock,
        )
        .expect("vote plans");

    assert!(matches!(
        step.outcome,
        VoteOutcome::AwaitingMoreVotes { outstanding: 1 }
    ));
    assert!(matches!(step.mutation, WorkflowMutation::RecordVote { .. }));
    assert!(step.notices.is_empty());
}

#[rstest]
fn final_approval_applies_the_deferred_transition(clock: DefaultClock) {
    let creator = MemberId::new();
    let voter = MemberId::new();
    let task = task_at(TaskStatus::Todo, creator);
    let enrolled = stakeholders_of(&[voter], &clock);
    let (state, record) =
        snapshot_with_ballot(task, enrolled, creator, TaskStatus::TaskReview, &[voter]);

    let step = state
        .plan_vote(record.id(), voter, VoteAction::Approve, None, &clock)
        .expect("vote plans");

    let VoteOutcome::Resolved { task, record } = step.outcome else {
        panic!("expected a resolved outcome");
    };
    assert_eq!(task.status(), TaskStatus::TaskReview);
    assert_eq!(record.review_result(), Some(ReviewResult::Passed));

    // Recipients learn whose change landed: the requester is the sender.
    let notice = step.notices.first().expect("status change notice");
    assert_eq!(notice.sender(), creator);
    assert!(matches!(
        notice.kind(),
        NoticeKind::StatusChanged {
            from: TaskStatus::Todo,
            to: TaskStatus::TaskReview,
        }
    ));
}

#[rstest]
fn rejection_closes_the_ballot_without_touching_the_task(clock: DefaultClock) {
    let creator = MemberId::new();
    let voters = [MemberId::new(), MemberId::new()];
    let task = task_at(TaskStatus::ResultReview, creator);
    let enrolled = stakeholders_of(&voters, &clock);
    let (state, record) =
        snapshot_with_ballot(task, enrolled, creator, TaskStatus::Done, &voters);

    let step = state
        .plan_vote(
            record.id(),
            voters[1],
            VoteAction::Reject,
            Some("not finished".to_owned()),
            &clock,
        )
        .expect("vote plans");

    let VoteOutcome::Rejected { record } = step.outcome else {
        panic!("expected a rejected outcome");
    };
    assert_eq!(record.review_result(), Some(ReviewResult::Rejected));
    assert!(matches!(
        step.mutation,
        WorkflowMutation::CloseBallotRejected { .. }
    ));

    let notice = step.notices.first().expect("rejection notice");
    assert_eq!(notice.recipients(), &BTreeSet::from([creator]));
    assert!(matches!(
        notice.kind(),
        NoticeKind::ApprovalRejected { .. }
    ));
}

#[rstest]
fn vote_against_unknown_ballot_is_rejected(clock: DefaultClock) {
    let creator = MemberId::new();
    let voter = MemberId::new();
    let task = task_at(TaskStatus::Todo, creator);
    let enrolled = stakeholders_of(&[voter], &clock);
    let (state, _record) =
        snapshot_with_ballot(task, enrolled, creator, TaskStatus::TaskReview, &[voter]);
    let stale_ballot = crate::workflow::domain::StatusChangeId::new();

    let result = state.plan_vote(stale_ballot, voter, VoteAction::Approve, None, &clock);

    assert!(matches!(
        result,
        Err(WorkflowError::NoSuchBallot { change_id, member })
            if change_id == stale_ballot && member == voter
    ));
}

#[rstest]
fn cancellation_is_reserved_for_the_requester(clock: DefaultClock) {
    let creator = MemberId::new();
    let voter = MemberId::new();
    let task = task_at(TaskStatus::Todo, creator);
    let enrolled = stakeholders_of(&[voter], &clock);
    let (state, _record) =
        snapshot_with_ballot(task, enrolled, creator, TaskStatus::TaskReview, &[voter]);

    let result = state.plan_cancellation(voter);

    assert!(matches!(
        result,
        Err(WorkflowError::NotRequester { member, requester })
            if member == voter && requester == creator
    ));
}

#[rstest]
fn cancellation_withdraws_the_ballot(clock: DefaultClock) {
    let creator = MemberId::new();
    let voters = [MemberId::new(), MemberId::new()];
    let task = task_at(TaskStatus::Todo, creator);
    let enrolled = stakeholders_of(&voters, &clock);
    let (state, record) =
        snapshot_with_ballot(task, enrolled, creator, TaskStatus::TaskReview, &voters);

    let step = state
        .plan_cancellation(creator)
        .expect("cancellation plans");

    assert_eq!(step.outcome.review_result(), Some(ReviewResult::Cancelled));
    assert!(matches!(
        step.mutation,
        WorkflowMutation::CancelBallot { change_id, .. } if change_id == record.id()
    ));
    let notice = step.notices.first().expect("withdrawal notice");
    assert_eq!(
        notice.recipients(),
        &voters.iter().copied().collect::<BTreeSet<_>>()
    );
}

#[rstest]
fn cancellation_without_ballot_is_rejected() {
    let creator = MemberId::new();
    let task = task_at(TaskStatus::Todo, creator);
    let task_id = task.id();
    let state = snapshot(task, Vec::new());

    let result = state.plan_cancellation(creator);

    assert!(matches!(
        result,
        Err(WorkflowError::NoOpenBallot(id)) if id == task_id
    ));
}

#[rstest]
fn stakeholder_addition_rejects_duplicates(clock: DefaultClock) {
    let creator = MemberId::new();
    let member = MemberId::new();
    let task = task_at(TaskStatus::Todo, creator);
    let state = snapshot(task, stakeholders_of(&[member], &clock));

    let result = state.plan_stakeholder_addition(
        &Actor::member(creator),
        member,
        StakeholderRole::Reviewer,
        &clock,
    );

    assert!(matches!(
        result,
        Err(WorkflowError::DuplicateStakeholder { member: duplicate, .. })
            if duplicate == member
    ));
}

#[rstest]
fn stakeholder_removal_requires_enrolment(clock: DefaultClock) {
    let creator = MemberId::new();
    let member = MemberId::new();
    let state = snapshot(task_at(TaskStatus::Todo, creator), Vec::new());

    let result = state.plan_stakeholder_removal(&Actor::member(creator), member);

    assert!(matches!(
        result,
        Err(WorkflowError::StakeholderNotFound { member: missing, .. })
            if missing == member
    ));
}

//! Behavioural integration tests for the approval workflow.
//!
//! Drives the public engine API through a realistic task lifecycle with
//! ballots at every review gate, verifying statuses, the ledger, and the
//! notification fan-out along the way.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

use greenlight::workflow::{
    adapters::memory::{
        DirectoryMentionScanner, InMemoryWorkflowRepository, RecordingNotificationSink,
    },
    domain::{
        Actor, MemberId, NoticeKind, ProjectId, ReviewResult, ReviewVerdict, StakeholderRole,
        StatusChangeRecord, TaskId, TaskStatus, TransitionOutcome, TransitionRequest, VoteAction,
        VoteOutcome,
    },
    services::{CreateTaskRequest, StakeholderRegistry, TransitionEngine},
};
use mockable::DefaultClock;
use std::sync::Arc;

type Engine = TransitionEngine<
    InMemoryWorkflowRepository,
    RecordingNotificationSink,
    DirectoryMentionScanner,
    DefaultClock,
>;
type Registry =
    StakeholderRegistry<InMemoryWorkflowRepository, RecordingNotificationSink, DefaultClock>;

struct Team {
    engine: Engine,
    registry: Registry,
    sink: Arc<RecordingNotificationSink>,
    creator: MemberId,
    assignee: MemberId,
    reviewers: [MemberId; 2],
}

fn team() -> Team {
    let creator = MemberId::new();
    let assignee = MemberId::new();
    let reviewers = [MemberId::new(), MemberId::new()];
    let repository = Arc::new(InMemoryWorkflowRepository::new());
    let sink = Arc::new(RecordingNotificationSink::new());
    let clock = Arc::new(DefaultClock);
    let mentions = Arc::new(DirectoryMentionScanner::new([(
        "devon".to_owned(),
        assignee,
    )]));
    let engine = TransitionEngine::new(
        Arc::clone(&repository),
        Arc::clone(&sink),
        mentions,
        Arc::clone(&clock),
    );
    let registry = StakeholderRegistry::new(repository, Arc::clone(&sink), clock);
    Team {
        engine,
        registry,
        sink,
        creator,
        assignee,
        reviewers,
    }
}

impl Team {
    async fn approve_ballot(&self, task_id: TaskId, record: &StatusChangeRecord) {
        let mut outcomes = Vec::new();
        for reviewer in self.reviewers {
            let outcome = self
                .engine
                .cast_vote(task_id, record.id(), reviewer, VoteAction::Approve, None)
                .await
                .expect("vote succeeds");
            outcomes.push(outcome);
        }
        assert!(matches!(
            outcomes.first(),
            Some(VoteOutcome::AwaitingMoreVotes { outstanding: 1 })
        ));
        assert!(matches!(outcomes.last(), Some(VoteOutcome::Resolved { .. })));
    }

    async fn request_gated(&self, task_id: TaskId, to: TaskStatus) -> StatusChangeRecord {
        let outcome = self
            .engine
            .request_transition(task_id, &Actor::member(self.creator), TransitionRequest::to(to))
            .await
            .expect("request succeeds");
        match outcome {
            TransitionOutcome::AwaitingApproval { record, .. } => record,
            TransitionOutcome::Applied { .. } => panic!("expected a ballot to open"),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn full_lifecycle_with_ballots_at_every_gate() {
    let team = team();
    let creator = Actor::member(team.creator);

    let task = team
        .engine
        .create_task(
            &creator,
            CreateTaskRequest::new(ProjectId::new(), "Importer rewrite")
                .with_description("@devon will own the cutover")
                .with_assignee(team.assignee)
                .with_stakeholder(team.reviewers[0], StakeholderRole::Reviewer)
                .with_stakeholder(team.reviewers[1], StakeholderRole::Stakeholder),
        )
        .await
        .expect("task creation succeeds");
    assert_eq!(task.status(), TaskStatus::Todo);

    // The assignee was mentioned in the description.
    assert!(team.sink.sent().iter().any(|notice| {
        matches!(notice.kind(), NoticeKind::Mentioned)
            && notice.recipients().contains(&team.assignee)
    }));

    // todo → task_review → in_progress → result_review, each behind a
    // unanimous ballot.
    for to in [
        TaskStatus::TaskReview,
        TaskStatus::InProgress,
        TaskStatus::ResultReview,
    ] {
        let record = team.request_gated(task.id(), to).await;
        team.approve_ballot(task.id(), &record).await;
    }

    // First completion attempt: one reviewer vetoes.
    let record = team.request_gated(task.id(), TaskStatus::Done).await;
    let veto = team
        .engine
        .cast_vote(
            task.id(),
            record.id(),
            team.reviewers[1],
            VoteAction::Reject,
            Some("migration notes missing".to_owned()),
        )
        .await
        .expect("vote succeeds");
    assert!(matches!(veto, VoteOutcome::Rejected { .. }));

    let snapshot = team
        .engine
        .workflow(task.id())
        .await
        .expect("workflow loads")
        .expect("task exists");
    assert_eq!(snapshot.task().status(), TaskStatus::ResultReview);
    assert!(snapshot.pending().is_none());

    // Second attempt passes.
    let record = team.request_gated(task.id(), TaskStatus::Done).await;
    team.approve_ballot(task.id(), &record).await;

    let snapshot = team
        .engine
        .workflow(task.id())
        .await
        .expect("workflow loads")
        .expect("task exists");
    assert_eq!(snapshot.task().status(), TaskStatus::Done);
    assert!(snapshot.task().completed_at().is_some());

    // The ledger respects the transition table end to end and holds no
    // open ballots.
    let history = team
        .engine
        .history(task.id())
        .await
        .expect("history loads");
    for entry in &history {
        match entry.from_status() {
            None => assert_eq!(entry.to_status(), TaskStatus::Todo),
            Some(from) => assert!(from.can_transition_to(entry.to_status())),
        }
    }
    assert_eq!(
        history.iter().filter(|entry| entry.is_pending()).count(),
        0
    );
    let rejected = history
        .iter()
        .filter(|entry| entry.review_result() == Some(ReviewResult::Rejected))
        .count();
    assert_eq!(rejected, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn withdrawn_ballots_reopen_cleanly() {
    let team = team();
    let creator = Actor::member(team.creator);

    let task = team
        .engine
        .create_task(
            &creator,
            CreateTaskRequest::new(ProjectId::new(), "Importer rewrite")
                .with_stakeholder(team.reviewers[0], StakeholderRole::Reviewer),
        )
        .await
        .expect("task creation succeeds");

    let record = team.request_gated(task.id(), TaskStatus::TaskReview).await;
    let withdrawn = team
        .engine
        .cancel_ballot(task.id(), &creator)
        .await
        .expect("cancellation succeeds");
    assert_eq!(withdrawn.id(), record.id());
    assert_eq!(withdrawn.review_result(), Some(ReviewResult::Cancelled));

    // The reviewer was told the request is gone.
    assert!(team.sink.sent().iter().any(|notice| {
        matches!(notice.kind(), NoticeKind::ApprovalCancelled { .. })
            && notice.recipients().contains(&team.reviewers[0])
    }));

    // The lane is free again.
    let record = team.request_gated(task.id(), TaskStatus::TaskReview).await;
    let outcome = team
        .engine
        .cast_vote(
            task.id(),
            record.id(),
            team.reviewers[0],
            VoteAction::Approve,
            None,
        )
        .await
        .expect("vote succeeds");
    assert!(matches!(outcome, VoteOutcome::Resolved { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn registry_changes_do_not_touch_open_ballots() {
    let team = team();
    let creator = Actor::member(team.creator);

    let task = team
        .engine
        .create_task(
            &creator,
            CreateTaskRequest::new(ProjectId::new(), "Importer rewrite")
                .with_stakeholder(team.reviewers[0], StakeholderRole::Reviewer),
        )
        .await
        .expect("task creation succeeds");

    let record = team.request_gated(task.id(), TaskStatus::TaskReview).await;

    // Late enrolment does not join the open ballot.
    team.registry
        .add(
            task.id(),
            &creator,
            team.reviewers[1],
            StakeholderRole::Reviewer,
        )
        .await
        .expect("late enrolment succeeds");

    let outcome = team
        .engine
        .cast_vote(
            task.id(),
            record.id(),
            team.reviewers[0],
            VoteAction::Approve,
            None,
        )
        .await
        .expect("vote succeeds");
    assert!(matches!(outcome, VoteOutcome::Resolved { .. }));

    // The next ballot picks the newcomer up.
    let record = team
        .request_gated(task.id(), TaskStatus::InProgress)
        .await;
    let outcome = team
        .engine
        .cast_vote(
            task.id(),
            record.id(),
            team.reviewers[1],
            VoteAction::Approve,
            None,
        )
        .await
        .expect("vote succeeds");
    assert!(matches!(
        outcome,
        VoteOutcome::AwaitingMoreVotes { outstanding: 1 }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn review_verdicts_ride_ungated_transitions() {
    let team = team();
    let creator = Actor::member(team.creator);

    let task = team
        .engine
        .create_task(
            &creator,
            CreateTaskRequest::new(ProjectId::new(), "Importer rewrite"),
        )
        .await
        .expect("task creation succeeds");

    team.engine
        .request_transition(
            task.id(),
            &creator,
            TransitionRequest::to(TaskStatus::TaskReview),
        )
        .await
        .expect("submission succeeds");
    team.engine
        .request_transition(
            task.id(),
            &creator,
            TransitionRequest::to(TaskStatus::InProgress)
                .with_verdict(ReviewVerdict::Passed)
                .with_comment("scope agreed"),
        )
        .await
        .expect("review verdict applies");

    let history = team
        .engine
        .history(task.id())
        .await
        .expect("history loads");
    let review = history.last().expect("review record exists");
    assert_eq!(review.review_result(), Some(ReviewResult::Passed));
    assert_eq!(review.comment(), Some("scope agreed"));
}

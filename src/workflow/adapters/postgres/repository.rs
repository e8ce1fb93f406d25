//! `PostgreSQL` repository implementation for workflow storage.

use super::{
    models::{
        ApprovalRow, HistoryRow, NewApprovalRow, NewHistoryRow, NewStakeholderRow, NewTaskRow,
        StakeholderRow, TaskRow,
    },
    schema::{task_stakeholders, task_status_approvals, task_status_history, tasks},
};
use crate::workflow::{
    domain::{
        ApprovalVote, Ballot, MemberId, PendingApproval, PersistedRecordData, PersistedTaskData,
        ProjectId, ReviewResult, ReviewType, Stakeholder, StakeholderRole, StatusChangeId,
        StatusChangeRecord, Task, TaskId, TaskStatus, VoteState, WorkflowMutation,
        WorkflowSnapshot,
    },
    ports::{WorkflowRepository, WorkflowRepositoryError, WorkflowRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by workflow adapters.
pub type WorkflowPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed workflow repository.
///
/// The version-gated `UPDATE` on the task row is the serialisation point:
/// every mutation's writes share that transaction, so concurrent commits
/// against the same snapshot version fail as stale instead of interleaving.
#[derive(Debug, Clone)]
pub struct PostgresWorkflowRepository {
    pool: WorkflowPgPool,
}

impl PostgresWorkflowRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: WorkflowPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> WorkflowRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> WorkflowRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(WorkflowRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(WorkflowRepositoryError::persistence)?
    }
}

impl From<DieselError> for WorkflowRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    async fn insert(
        &self,
        task: &Task,
        stakeholders: &[Stakeholder],
        creation_record: &StatusChangeRecord,
    ) -> WorkflowRepositoryResult<()> {
        let task_id = task.id();
        let new_task = task_to_new_row(task, 1);
        let new_stakeholders: Vec<NewStakeholderRow> = stakeholders
            .iter()
            .map(|stakeholder| stakeholder_to_new_row(task_id, stakeholder))
            .collect();
        let new_record = record_to_new_row(creation_record);

        self.run_blocking(move |connection| {
            connection.transaction(|conn| {
                diesel::insert_into(tasks::table)
                    .values(&new_task)
                    .execute(conn)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            WorkflowRepositoryError::DuplicateTask(task_id)
                        }
                        other => WorkflowRepositoryError::persistence(other),
                    })?;
                if !new_stakeholders.is_empty() {
                    diesel::insert_into(task_stakeholders::table)
                        .values(&new_stakeholders)
                        .execute(conn)?;
                }
                diesel::insert_into(task_status_history::table)
                    .values(&new_record)
                    .execute(conn)?;
                Ok(())
            })
        })
        .await
    }

    async fn load(&self, task_id: TaskId) -> WorkflowRepositoryResult<Option<WorkflowSnapshot>> {
        self.run_blocking(move |connection| {
            connection.transaction(|conn| {
                let Some(task_row) = tasks::table
                    .find(task_id.into_inner())
                    .select(TaskRow::as_select())
                    .first::<TaskRow>(conn)
                    .optional()?
                else {
                    return Ok(None);
                };

                let stakeholder_rows = task_stakeholders::table
                    .filter(task_stakeholders::task_id.eq(task_id.into_inner()))
                    .order(task_stakeholders::created_at.asc())
                    .select(StakeholderRow::as_select())
                    .load::<StakeholderRow>(conn)?;

                let pending_row = task_status_history::table
                    .filter(task_status_history::task_id.eq(task_id.into_inner()))
                    .filter(
                        task_status_history::review_result.eq(ReviewResult::Pending.as_str()),
                    )
                    .select(HistoryRow::as_select())
                    .first::<HistoryRow>(conn)
                    .optional()?;

                let pending = pending_row
                    .map(|row| load_pending(conn, row))
                    .transpose()?;

                let version = task_row.version;
                let task = row_to_task(task_row)?;
                let stakeholders = stakeholder_rows
                    .into_iter()
                    .map(row_to_stakeholder)
                    .collect::<WorkflowRepositoryResult<Vec<_>>>()?;

                Ok(Some(WorkflowSnapshot::new(
                    version,
                    task,
                    stakeholders,
                    pending,
                )))
            })
        })
        .await
    }

    async fn commit(
        &self,
        task_id: TaskId,
        expected_version: i64,
        mutation: WorkflowMutation,
    ) -> WorkflowRepositoryResult<()> {
        self.run_blocking(move |connection| {
            connection.transaction(|conn| apply_mutation(conn, task_id, expected_version, mutation))
        })
        .await
    }

    async fn history(&self, task_id: TaskId) -> WorkflowRepositoryResult<Vec<StatusChangeRecord>> {
        self.run_blocking(move |connection| {
            let rows = task_status_history::table
                .filter(task_status_history::task_id.eq(task_id.into_inner()))
                .order(task_status_history::changed_at.asc())
                .select(HistoryRow::as_select())
                .load::<HistoryRow>(connection)?;
            rows.into_iter().map(row_to_record).collect()
        })
        .await
    }

    async fn remove(&self, task_id: TaskId) -> WorkflowRepositoryResult<()> {
        self.run_blocking(move |connection| {
            connection.transaction(|conn| {
                let change_ids = task_status_history::table
                    .filter(task_status_history::task_id.eq(task_id.into_inner()))
                    .select(task_status_history::id);
                diesel::delete(
                    task_status_approvals::table
                        .filter(task_status_approvals::status_change_id.eq_any(change_ids)),
                )
                .execute(conn)?;
                diesel::delete(
                    task_status_history::table
                        .filter(task_status_history::task_id.eq(task_id.into_inner())),
                )
                .execute(conn)?;
                diesel::delete(
                    task_stakeholders::table
                        .filter(task_stakeholders::task_id.eq(task_id.into_inner())),
                )
                .execute(conn)?;
                let deleted =
                    diesel::delete(tasks::table.find(task_id.into_inner())).execute(conn)?;
                if deleted == 0 {
                    return Err(WorkflowRepositoryError::NotFound(task_id));
                }
                Ok(())
            })
        })
        .await
    }
}

/// Applies one mutation inside the commit transaction.
fn apply_mutation(
    conn: &mut PgConnection,
    task_id: TaskId,
    expected_version: i64,
    mutation: WorkflowMutation,
) -> WorkflowRepositoryResult<()> {
    match mutation {
        WorkflowMutation::ApplyTransition { task, record } => {
            gate_version_with_task(conn, task_id, expected_version, &task)?;
            insert_record(conn, &record)
        }
        WorkflowMutation::OpenBallot { record, ballot } => {
            gate_version(conn, task_id, expected_version)?;
            insert_record(conn, &record)?;
            insert_votes(conn, &ballot)
        }
        WorkflowMutation::RecordVote { change_id, vote } => {
            gate_version(conn, task_id, expected_version)?;
            store_vote(conn, change_id, &vote)
        }
        WorkflowMutation::CloseBallotRejected {
            change_id,
            vote,
            record,
        } => {
            gate_version(conn, task_id, expected_version)?;
            store_vote(conn, change_id, &vote)?;
            store_review_result(conn, &record)
        }
        WorkflowMutation::ResolveBallot {
            change_id,
            vote,
            record,
            task,
        } => {
            gate_version_with_task(conn, task_id, expected_version, &task)?;
            store_vote(conn, change_id, &vote)?;
            store_review_result(conn, &record)
        }
        WorkflowMutation::CancelBallot { change_id, record } => {
            gate_version(conn, task_id, expected_version)?;
            store_review_result(conn, &record)?;
            diesel::delete(
                task_status_approvals::table
                    .filter(task_status_approvals::status_change_id.eq(change_id.into_inner())),
            )
            .execute(conn)?;
            Ok(())
        }
        WorkflowMutation::AddStakeholder { stakeholder } => {
            gate_version(conn, task_id, expected_version)?;
            diesel::insert_into(task_stakeholders::table)
                .values(stakeholder_to_new_row(task_id, &stakeholder))
                .execute(conn)?;
            Ok(())
        }
        WorkflowMutation::RemoveStakeholder { member_id } => {
            gate_version(conn, task_id, expected_version)?;
            diesel::delete(
                task_stakeholders::table.find((task_id.into_inner(), member_id.into_inner())),
            )
            .execute(conn)?;
            Ok(())
        }
    }
}

/// Bumps the task version; the serialisation point of every commit.
fn gate_version(
    conn: &mut PgConnection,
    task_id: TaskId,
    expected_version: i64,
) -> WorkflowRepositoryResult<()> {
    let updated = diesel::update(
        tasks::table
            .find(task_id.into_inner())
            .filter(tasks::version.eq(expected_version)),
    )
    .set(tasks::version.eq(expected_version + 1))
    .execute(conn)?;
    if updated == 0 {
        return Err(WorkflowRepositoryError::StaleSnapshot(task_id));
    }
    Ok(())
}

/// Bumps the task version and writes the mutated task columns with it.
fn gate_version_with_task(
    conn: &mut PgConnection,
    task_id: TaskId,
    expected_version: i64,
    task: &Task,
) -> WorkflowRepositoryResult<()> {
    let updated = diesel::update(
        tasks::table
            .find(task_id.into_inner())
            .filter(tasks::version.eq(expected_version)),
    )
    .set((
        tasks::version.eq(expected_version + 1),
        tasks::status.eq(task.status().as_str()),
        tasks::completed_at.eq(task.completed_at()),
        tasks::updated_at.eq(task.updated_at()),
    ))
    .execute(conn)?;
    if updated == 0 {
        return Err(WorkflowRepositoryError::StaleSnapshot(task_id));
    }
    Ok(())
}

fn insert_record(
    conn: &mut PgConnection,
    record: &StatusChangeRecord,
) -> WorkflowRepositoryResult<()> {
    diesel::insert_into(task_status_history::table)
        .values(record_to_new_row(record))
        .execute(conn)?;
    Ok(())
}

fn insert_votes(conn: &mut PgConnection, ballot: &Ballot) -> WorkflowRepositoryResult<()> {
    let rows: Vec<NewApprovalRow> = ballot
        .votes()
        .values()
        .map(|vote| vote_to_new_row(ballot.change_id(), vote))
        .collect();
    if !rows.is_empty() {
        diesel::insert_into(task_status_approvals::table)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(())
}

fn store_vote(
    conn: &mut PgConnection,
    change_id: StatusChangeId,
    vote: &ApprovalVote,
) -> WorkflowRepositoryResult<()> {
    diesel::update(
        task_status_approvals::table
            .find((change_id.into_inner(), vote.stakeholder_id().into_inner())),
    )
    .set((
        task_status_approvals::approval_status.eq(vote.state().as_str()),
        task_status_approvals::comment.eq(vote.comment()),
        task_status_approvals::approved_at.eq(vote.resolved_at()),
    ))
    .execute(conn)?;
    Ok(())
}

fn store_review_result(
    conn: &mut PgConnection,
    record: &StatusChangeRecord,
) -> WorkflowRepositoryResult<()> {
    diesel::update(task_status_history::table.find(record.id().into_inner()))
        .set(
            task_status_history::review_result
                .eq(record.review_result().map(ReviewResult::as_str)),
        )
        .execute(conn)?;
    Ok(())
}

fn load_pending(
    conn: &mut PgConnection,
    row: HistoryRow,
) -> WorkflowRepositoryResult<PendingApproval> {
    let vote_rows = task_status_approvals::table
        .filter(task_status_approvals::status_change_id.eq(row.id))
        .order(task_status_approvals::stakeholder_id.asc())
        .select(ApprovalRow::as_select())
        .load::<ApprovalRow>(conn)?;
    let record = row_to_record(row)?;
    let votes = vote_rows
        .into_iter()
        .map(row_to_vote)
        .collect::<WorkflowRepositoryResult<Vec<_>>>()?;
    Ok(PendingApproval::new(
        record.clone(),
        Ballot::from_persisted(record.id(), votes),
    ))
}

fn task_to_new_row(task: &Task, version: i64) -> NewTaskRow {
    NewTaskRow {
        id: task.id().into_inner(),
        project_id: task.project_id().into_inner(),
        title: task.title().to_owned(),
        description: task.description().map(ToOwned::to_owned),
        assignee_id: task.assignee().map(MemberId::into_inner),
        created_by: task.created_by().into_inner(),
        status: task.status().as_str().to_owned(),
        completed_at: task.completed_at(),
        version,
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    }
}

fn row_to_task(row: TaskRow) -> WorkflowRepositoryResult<Task> {
    let status = TaskStatus::try_from(row.status.as_str())
        .map_err(WorkflowRepositoryError::persistence)?;
    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(row.id),
        project_id: ProjectId::from_uuid(row.project_id),
        title: row.title,
        description: row.description,
        assignee: row.assignee_id.map(MemberId::from_uuid),
        created_by: MemberId::from_uuid(row.created_by),
        status,
        completed_at: row.completed_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

fn stakeholder_to_new_row(task_id: TaskId, stakeholder: &Stakeholder) -> NewStakeholderRow {
    NewStakeholderRow {
        task_id: task_id.into_inner(),
        member_id: stakeholder.member_id().into_inner(),
        role: stakeholder.role().as_str().to_owned(),
        created_at: stakeholder.added_at(),
    }
}

fn row_to_stakeholder(row: StakeholderRow) -> WorkflowRepositoryResult<Stakeholder> {
    let role = StakeholderRole::try_from(row.role.as_str())
        .map_err(WorkflowRepositoryError::persistence)?;
    Ok(Stakeholder::from_persisted(
        MemberId::from_uuid(row.member_id),
        role,
        row.created_at,
    ))
}

fn record_to_new_row(record: &StatusChangeRecord) -> NewHistoryRow {
    NewHistoryRow {
        id: record.id().into_inner(),
        task_id: record.task_id().into_inner(),
        from_status: record
            .from_status()
            .map(|status| status.as_str().to_owned()),
        to_status: record.to_status().as_str().to_owned(),
        changed_by: record.changed_by().into_inner(),
        comment: record.comment().map(ToOwned::to_owned),
        review_type: record
            .review_type()
            .map(|review_type| review_type.as_str().to_owned()),
        review_result: record
            .review_result()
            .map(|result| result.as_str().to_owned()),
        review_feedback: record.review_feedback().map(ToOwned::to_owned),
        changed_at: record.changed_at(),
    }
}

fn row_to_record(row: HistoryRow) -> WorkflowRepositoryResult<StatusChangeRecord> {
    let from_status = row
        .from_status
        .as_deref()
        .map(TaskStatus::try_from)
        .transpose()
        .map_err(WorkflowRepositoryError::persistence)?;
    let to_status = TaskStatus::try_from(row.to_status.as_str())
        .map_err(WorkflowRepositoryError::persistence)?;
    let review_type = row
        .review_type
        .as_deref()
        .map(ReviewType::try_from)
        .transpose()
        .map_err(WorkflowRepositoryError::persistence)?;
    let review_result = row
        .review_result
        .as_deref()
        .map(ReviewResult::try_from)
        .transpose()
        .map_err(WorkflowRepositoryError::persistence)?;

    Ok(StatusChangeRecord::from_persisted(PersistedRecordData {
        id: StatusChangeId::from_uuid(row.id),
        task_id: TaskId::from_uuid(row.task_id),
        from_status,
        to_status,
        changed_by: MemberId::from_uuid(row.changed_by),
        comment: row.comment,
        review_type,
        review_result,
        review_feedback: row.review_feedback,
        changed_at: row.changed_at,
    }))
}

fn vote_to_new_row(change_id: StatusChangeId, vote: &ApprovalVote) -> NewApprovalRow {
    NewApprovalRow {
        status_change_id: change_id.into_inner(),
        stakeholder_id: vote.stakeholder_id().into_inner(),
        approval_status: vote.state().as_str().to_owned(),
        comment: vote.comment().map(ToOwned::to_owned),
        created_at: vote.created_at(),
        approved_at: vote.resolved_at(),
    }
}

fn row_to_vote(row: ApprovalRow) -> WorkflowRepositoryResult<ApprovalVote> {
    let state = VoteState::try_from(row.approval_status.as_str())
        .map_err(WorkflowRepositoryError::persistence)?;
    Ok(ApprovalVote::from_persisted(
        MemberId::from_uuid(row.stakeholder_id),
        state,
        row.comment,
        row.created_at,
        row.approved_at,
    ))
}

//! In-memory repository for workflow tests and examples.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::workflow::{
    domain::{
        Ballot, PendingApproval, Stakeholder, StatusChangeId, StatusChangeRecord, Task, TaskId,
        WorkflowMutation, WorkflowSnapshot,
    },
    ports::{WorkflowRepository, WorkflowRepositoryError, WorkflowRepositoryResult},
};

/// Thread-safe in-memory workflow repository.
///
/// The write lock serialises commits, so the optimistic version check
/// behaves exactly as it does against the database adapter.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkflowRepository {
    state: Arc<RwLock<HashMap<TaskId, StoredWorkflow>>>,
}

#[derive(Debug, Clone)]
struct StoredWorkflow {
    version: i64,
    task: Task,
    stakeholders: Vec<Stakeholder>,
    history: Vec<StatusChangeRecord>,
    ballots: HashMap<StatusChangeId, Ballot>,
}

impl InMemoryWorkflowRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> WorkflowRepositoryError {
    WorkflowRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

fn corrupt(message: &str) -> WorkflowRepositoryError {
    WorkflowRepositoryError::persistence(std::io::Error::other(message.to_owned()))
}

impl StoredWorkflow {
    fn pending(&self) -> WorkflowRepositoryResult<Option<PendingApproval>> {
        let Some(record) = self.history.iter().find(|record| record.is_pending()) else {
            return Ok(None);
        };
        let ballot = self
            .ballots
            .get(&record.id())
            .ok_or_else(|| corrupt("pending record has no ballot"))?;
        Ok(Some(PendingApproval::new(record.clone(), ballot.clone())))
    }

    fn replace_record(&mut self, record: StatusChangeRecord) -> WorkflowRepositoryResult<()> {
        let slot = self
            .history
            .iter_mut()
            .find(|existing| existing.id() == record.id())
            .ok_or_else(|| corrupt("ledger record vanished"))?;
        *slot = record;
        Ok(())
    }

    fn apply(&mut self, mutation: WorkflowMutation) -> WorkflowRepositoryResult<()> {
        match mutation {
            WorkflowMutation::ApplyTransition { task, record } => {
                self.task = task;
                self.history.push(record);
            }
            WorkflowMutation::OpenBallot { record, ballot } => {
                self.ballots.insert(record.id(), ballot);
                self.history.push(record);
            }
            WorkflowMutation::RecordVote { change_id, vote } => {
                self.ballots
                    .get_mut(&change_id)
                    .ok_or_else(|| corrupt("ballot vanished"))?
                    .record(vote);
            }
            WorkflowMutation::CloseBallotRejected {
                change_id,
                vote,
                record,
            } => {
                self.ballots
                    .get_mut(&change_id)
                    .ok_or_else(|| corrupt("ballot vanished"))?
                    .record(vote);
                self.replace_record(record)?;
            }
            WorkflowMutation::ResolveBallot {
                change_id,
                vote,
                record,
                task,
            } => {
                self.ballots
                    .get_mut(&change_id)
                    .ok_or_else(|| corrupt("ballot vanished"))?
                    .record(vote);
                self.replace_record(record)?;
                self.task = task;
            }
            WorkflowMutation::CancelBallot { change_id, record } => {
                // Withdrawn votes carry no audit value.
                self.ballots.remove(&change_id);
                self.replace_record(record)?;
            }
            WorkflowMutation::AddStakeholder { stakeholder } => {
                self.stakeholders.push(stakeholder);
            }
            WorkflowMutation::RemoveStakeholder { member_id } => {
                self.stakeholders
                    .retain(|stakeholder| stakeholder.member_id() != member_id);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn insert(
        &self,
        task: &Task,
        stakeholders: &[Stakeholder],
        creation_record: &StatusChangeRecord,
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.contains_key(&task.id()) {
            return Err(WorkflowRepositoryError::DuplicateTask(task.id()));
        }
        state.insert(
            task.id(),
            StoredWorkflow {
                version: 1,
                task: task.clone(),
                stakeholders: stakeholders.to_vec(),
                history: vec![creation_record.clone()],
                ballots: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn load(&self, task_id: TaskId) -> WorkflowRepositoryResult<Option<WorkflowSnapshot>> {
        let state = self.state.read().map_err(lock_error)?;
        let Some(stored) = state.get(&task_id) else {
            return Ok(None);
        };
        Ok(Some(WorkflowSnapshot::new(
            stored.version,
            stored.task.clone(),
            stored.stakeholders.clone(),
            stored.pending()?,
        )))
    }

    async fn commit(
        &self,
        task_id: TaskId,
        expected_version: i64,
        mutation: WorkflowMutation,
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let stored = state
            .get_mut(&task_id)
            .ok_or(WorkflowRepositoryError::NotFound(task_id))?;
        if stored.version != expected_version {
            return Err(WorkflowRepositoryError::StaleSnapshot(task_id));
        }
        stored.apply(mutation)?;
        stored.version += 1;
        Ok(())
    }

    async fn history(&self, task_id: TaskId) -> WorkflowRepositoryResult<Vec<StatusChangeRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .get(&task_id)
            .map(|stored| stored.history.clone())
            .unwrap_or_default())
    }

    async fn remove(&self, task_id: TaskId) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state
            .remove(&task_id)
            .map(|_| ())
            .ok_or(WorkflowRepositoryError::NotFound(task_id))
    }
}

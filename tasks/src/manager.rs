use crate::error::{StoreError, TaskError};
use crate::metrics_defs::{TASKS_CREATED, TASK_DURATION, TASK_TRANSITIONS};
use crate::store::{CasOutcome, TaskStore};
use crate::types::{Task, TaskId, TaskKind, TaskStatus};
use serde_json::Value;
use shared::{counter, histogram};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

// Attempts before giving up on an identifier collision or a CAS race.
const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Applied(Task),
    /// The task was already in the requested state with the same result.
    Unchanged(Task),
}

impl AdvanceOutcome {
    pub fn task(&self) -> &Task {
        match self {
            AdvanceOutcome::Applied(task) | AdvanceOutcome::Unchanged(task) => task,
        }
    }
}

/// Handle on a dispatched job. Dropping it does not cancel the job.
#[derive(Debug)]
pub struct DispatchHandle {
    id: TaskId,
    handle: JoinHandle<Result<AdvanceOutcome, TaskError>>,
}

impl DispatchHandle {
    pub fn task_id(&self) -> TaskId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the job and returns how its terminal advance went.
    ///
    /// `Applied` means this job's outcome is the one stored on the task.
    pub async fn wait(self) -> Result<AdvanceOutcome, TaskError> {
        self.handle
            .await
            .map_err(|e| TaskError::Join(self.id, e.to_string()))?
    }
}

/// Creates, advances and reports tasks.
///
/// Holds no authorization logic; callers compare [`Task::owner`] themselves.
#[derive(Clone)]
pub struct TaskManager {
    store: Arc<dyn TaskStore>,
}

impl TaskManager {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Persists a new task in `waiting` and returns its identifier.
    pub async fn create(
        &self,
        owner: &str,
        kind: TaskKind,
        payload: Value,
    ) -> Result<TaskId, TaskError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let task = Task::new(owner, kind, payload.clone());
            let id = task.id;
            match self.store.insert(task).await {
                Ok(()) => {
                    counter!(TASKS_CREATED, "kind" => kind.as_str()).increment(1);
                    tracing::debug!(task_id = %id, owner, "Task created");
                    return Ok(id);
                }
                Err(StoreError::Duplicate(_)) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(task_id = %id, "Task identifier collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Runs `job` on the runtime without waiting for it.
    ///
    /// The task moves to `running` when the job starts, then to `done` with the
    /// job's output or to `failed` with its error payload.
    pub fn dispatch<F>(&self, id: TaskId, job: F) -> DispatchHandle
    where
        F: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            let started = Instant::now();

            // A duplicate dispatch finds the task past `waiting`; the job still runs
            // and its terminal advance decides.
            if let Err(e) = manager.advance(id, TaskStatus::Running, None).await {
                tracing::warn!(task_id = %id, error = %e, "Could not mark task as running");
            }

            let (status, result) = match job.await {
                Ok(output) => (TaskStatus::Done, output),
                Err(payload) => (TaskStatus::Failed, payload),
            };

            histogram!(TASK_DURATION, "status" => status.as_str())
                .record(started.elapsed().as_secs_f64());

            match manager.advance(id, status, Some(result)).await {
                Ok(outcome) => Ok(outcome),
                Err(e) => {
                    tracing::error!(task_id = %id, error = %e, "Could not record task outcome");
                    Err(e)
                }
            }
        });

        DispatchHandle { id, handle }
    }

    /// Moves a task forward.
    ///
    /// Repeating the transition that produced the current state with the same
    /// result is a no-op. Every other transition not allowed by
    /// [`TaskStatus::can_transition_to`] is rejected and the task is left as is.
    pub async fn advance(
        &self,
        id: TaskId,
        status: TaskStatus,
        result: Option<Value>,
    ) -> Result<AdvanceOutcome, TaskError> {
        for _ in 0..MAX_ATTEMPTS {
            let current = self
                .store
                .select_by_id(id)
                .await?
                .ok_or(TaskError::NotFound(id))?;

            if current.status == status && current.result == result {
                counter!(TASK_TRANSITIONS, "status" => status.as_str(), "outcome" => "unchanged")
                    .increment(1);
                return Ok(AdvanceOutcome::Unchanged(current));
            }

            if !current.status.can_transition_to(&status) {
                counter!(TASK_TRANSITIONS, "status" => status.as_str(), "outcome" => "rejected")
                    .increment(1);
                tracing::warn!(
                    task_id = %id,
                    from = %current.status,
                    to = %status,
                    "Rejected task transition"
                );
                return Err(TaskError::InvalidTransition {
                    id,
                    from: current.status,
                    to: status,
                });
            }

            match self
                .store
                .compare_and_set(id, current.status, status, result.clone())
                .await?
            {
                CasOutcome::Applied(task) => {
                    counter!(TASK_TRANSITIONS, "status" => status.as_str(), "outcome" => "applied")
                        .increment(1);
                    tracing::debug!(task_id = %id, from = %current.status, to = %status, "Task advanced");
                    return Ok(AdvanceOutcome::Applied(task));
                }
                // Someone else advanced it in between; re-evaluate against the new state
                CasOutcome::Stale(_) => continue,
            }
        }

        Err(TaskError::Contention(id))
    }

    pub async fn get(&self, id: TaskId) -> Result<Option<Task>, TaskError> {
        Ok(self.store.select_by_id(id).await?)
    }
}

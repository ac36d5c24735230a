use crate::error::StoreError;
use crate::types::{Task, TaskId, TaskStatus};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Result of a compare-and-set on a task's status.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The status matched and the task was updated.
    Applied(Task),
    /// The status had already moved on. Carries the task as currently stored.
    Stale(Task),
}

/// Durable storage for tasks. Tasks are never deleted through this trait.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a new task, failing if the identifier is taken.
    async fn insert(&self, task: Task) -> Result<(), StoreError>;

    /// Sets `status` and `result` only if the stored status is still `expected`.
    async fn compare_and_set(
        &self,
        id: TaskId,
        expected: TaskStatus,
        status: TaskStatus,
        result: Option<Value>,
    ) -> Result<CasOutcome, StoreError>;

    async fn select_by_id(&self, id: TaskId) -> Result<Option<Task>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: Task) -> Result<(), StoreError> {
        match self.tasks.write().entry(task.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(task.id)),
            Entry::Vacant(slot) => {
                slot.insert(task);
                Ok(())
            }
        }
    }

    async fn compare_and_set(
        &self,
        id: TaskId,
        expected: TaskStatus,
        status: TaskStatus,
        result: Option<Value>,
    ) -> Result<CasOutcome, StoreError> {
        let mut tasks = self.tasks.write();
        let task = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if task.status != expected {
            return Ok(CasOutcome::Stale(task.clone()));
        }

        task.status = status;
        task.result = result;
        task.updated_at = Utc::now();
        Ok(CasOutcome::Applied(task.clone()))
    }

    async fn select_by_id(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().get(&id).cloned())
    }
}

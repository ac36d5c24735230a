use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

pub type TaskId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    SingleBatch,
}

impl TaskKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskKind::SingleBatch => "single_batch",
        }
    }
}

/// Task status. Moves forward only:
///
/// ```text
/// Waiting -> Running, Done, Failed
/// Running -> Done, Failed
/// Done, Failed -> (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Waiting,
    Running,
    Done,
    Failed,
}

impl TaskStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Waiting => "waiting",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    /// Self-transitions are not transitions and return `false`.
    pub fn can_transition_to(&self, next: &TaskStatus) -> bool {
        match self {
            TaskStatus::Waiting => matches!(
                next,
                TaskStatus::Running | TaskStatus::Done | TaskStatus::Failed
            ),
            TaskStatus::Running => matches!(next, TaskStatus::Done | TaskStatus::Failed),
            TaskStatus::Done | TaskStatus::Failed => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Tenant that created the task. Never changes.
    pub owner: String,
    pub kind: TaskKind,
    pub payload: Value,
    pub status: TaskStatus,
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// A fresh task in `waiting` with a random identifier.
    pub fn new(owner: &str, kind: TaskKind, payload: Value) -> Self {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            kind,
            payload,
            status: TaskStatus::Waiting,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }
}

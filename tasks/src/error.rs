use crate::types::{TaskId, TaskStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("task {0} already exists")]
    Duplicate(TaskId),

    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("task store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("invalid transition for task {id}: {from} -> {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("task {0} kept changing while being advanced")]
    Contention(TaskId),

    #[error("dispatched job for task {0} did not finish: {1}")]
    Join(TaskId, String),

    #[error("task store error: {0}")]
    Store(#[from] StoreError),
}

//! Lifecycle of long-running optimization jobs.

pub mod error;
pub mod manager;
pub mod metrics_defs;
pub mod store;
pub mod types;

pub use error::{StoreError, TaskError};
pub use manager::{AdvanceOutcome, DispatchHandle, TaskManager};
pub use store::{CasOutcome, InMemoryTaskStore, TaskStore};
pub use types::{Task, TaskId, TaskKind, TaskStatus};

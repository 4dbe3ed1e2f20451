// src/store/mod.rs

//! Persistence for workflows, tasks and results.
//!
//! Everything that mutates a workflow graph goes through [`Store`]:
//! - [`MemoryStore`] keeps rows in process memory (tests, `backend = "memory"`).
//! - [`SqliteStore`] persists to a SQLite file.
//!
//! The two operations that must be safe under several concurrent workers are
//! [`Store::claim_task`] (`Queued -> Running`) and the terminal writes
//! [`Store::complete_task`] / [`Store::fail_task`] (`Running -> ...`). Both
//! backends implement them as single conditional updates.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::model::{LoadedTask, ResultRecord, Task, Workflow};
use crate::types::{StoreBackend, TaskStatus, WorkflowStatus};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Message(String),

    #[error("workflow not found: {0}")]
    WorkflowNotFound(Uuid),

    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("task {task_id} is {actual}, expected {expected}")]
    StatusConflict {
        task_id: Uuid,
        expected: TaskStatus,
        actual: TaskStatus,
    },

    #[error("task {task_id} cannot depend on {depends_on}: not in the same workflow")]
    InvalidDependency { task_id: Uuid, depends_on: Uuid },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("store worker thread failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Shared handle used across the builder, runner, worker and HTTP layer.
pub type SharedStore = Arc<dyn Store>;

/// Open the backend selected by `[store]`.
pub fn open(cfg: &StoreConfig) -> StoreResult<SharedStore> {
    Ok(match cfg.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&cfg.path)?),
    })
}

/// Repository contract for the workflow/task tables.
#[async_trait]
pub trait Store: Send + Sync + Debug {
    /// Insert a new workflow in `Initial` state.
    async fn create_workflow(&self, client_id: &str) -> StoreResult<Workflow>;

    async fn get_workflow(&self, workflow_id: Uuid) -> StoreResult<Option<Workflow>>;

    /// Move a workflow forward to `status`.
    ///
    /// Returns `false` (and writes nothing) when the transition would not be
    /// forward, e.g. the workflow is already terminal.
    async fn advance_workflow_status(
        &self,
        workflow_id: Uuid,
        status: WorkflowStatus,
    ) -> StoreResult<bool>;

    /// Insert a batch of new tasks. Their workflow must exist.
    async fn insert_tasks(&self, tasks: &[Task]) -> StoreResult<()>;

    /// Set (or clear) the dependency reference of existing tasks.
    ///
    /// Each pair is `(task_id, depends_on)`. A dependency must belong to the
    /// same workflow as the task.
    async fn save_task_dependencies(&self, links: &[(Uuid, Option<Uuid>)]) -> StoreResult<()>;

    async fn get_task(&self, task_id: Uuid) -> StoreResult<Option<Task>>;

    /// All tasks of a workflow, ordered by step number (ties in insertion
    /// order).
    async fn tasks_for_workflow(&self, workflow_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Up to `limit` eligible tasks in insertion order, with their workflow
    /// loaded, skipping ids listed in `exclude`.
    ///
    /// A task is eligible when it is `Queued` and it either has no
    /// dependency or its dependency is `Completed`.
    async fn find_eligible(&self, limit: usize, exclude: &[Uuid]) -> StoreResult<Vec<LoadedTask>>;

    /// Atomically move a task from `Queued` to `Running`.
    ///
    /// Returns the updated task, or `None` if the task was not `Queued`
    /// (another worker claimed it first).
    async fn claim_task(&self, task_id: Uuid) -> StoreResult<Option<Task>>;

    /// `Running -> Completed`, storing `progress` and the result row.
    async fn complete_task(
        &self,
        task_id: Uuid,
        progress: Option<String>,
        result: ResultRecord,
    ) -> StoreResult<Task>;

    /// `Running -> Failed`; clears any partial progress.
    async fn fail_task(&self, task_id: Uuid) -> StoreResult<Task>;

    async fn get_result_for_task(&self, task_id: Uuid) -> StoreResult<Option<ResultRecord>>;
}

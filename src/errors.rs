// src/errors.rs

//! Crate-wide error types.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;
use crate::types::TaskStatus;

#[derive(Error, Debug)]
pub enum GeoflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid workflow definition: {0}")]
    DefinitionParse(String),

    #[error("Cycle detected in workflow definition: {0}")]
    DagCycle(String),

    #[error("No job found for task type: {0}")]
    UnknownTaskType(String),

    #[error("Job for task {task_id} failed: {source}")]
    JobExecution {
        task_id: Uuid,
        #[source]
        source: JobError,
    },

    #[error("Task {task_id} is {status}; only queued tasks can be run")]
    TaskNotQueued { task_id: Uuid, status: TaskStatus },

    #[error("Task {0} was claimed by another worker")]
    ClaimLost(Uuid),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures raised by a job's own domain logic.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("{0}")]
    InvalidGeometry(String),

    #[error("job timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GeoflowError>;

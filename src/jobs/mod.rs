// src/jobs/mod.rs

//! Job implementations and the registry that maps task types to them.
//!
//! A [`Job`] only computes an output from a [`LoadedTask`]; it never writes
//! the task row. Persisting the outcome is the task runner's job.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::JobError;
use crate::model::LoadedTask;
use crate::store::SharedStore;

pub mod analysis;
pub mod geometry;
pub mod notification;
pub mod polygon_area;
pub mod registry;
pub mod report;

pub use analysis::AnalysisJob;
pub use notification::NotificationJob;
pub use polygon_area::PolygonAreaJob;
pub use registry::{JobFactory, JobRegistry};
pub use report::ReportGenerationJob;

pub type JobResult = std::result::Result<Value, JobError>;

/// Execution strategy bound to a task type.
#[async_trait]
pub trait Job: Send + Sync {
    async fn run(&self, task: &LoadedTask) -> JobResult;
}

/// Collaborators a job factory may hand to the job it builds.
#[derive(Debug, Clone)]
pub struct JobDeps {
    pub store: SharedStore,
}

impl JobDeps {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

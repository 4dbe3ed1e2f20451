// src/model/task.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::Workflow;
use crate::types::TaskStatus;

/// One unit of work within a workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: Uuid,
    pub client_id: String,
    /// Serialized input geometry shared by every task of the workflow.
    pub geo_json: String,
    pub status: TaskStatus,
    /// Job output once completed (string-serialized).
    pub progress: Option<String>,
    pub result_id: Option<Uuid>,
    /// Key into the job registry.
    pub task_type: String,
    /// Advisory ordering within the workflow; not unique.
    pub step_number: u32,
    /// The single predecessor that must complete first.
    pub depends_on: Option<Uuid>,
    pub workflow_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// A `Queued` task with no dependency wired yet.
    pub fn new_queued(
        workflow: &Workflow,
        task_type: impl Into<String>,
        step_number: u32,
        geo_json: impl Into<String>,
    ) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            client_id: workflow.client_id.clone(),
            geo_json: geo_json.into(),
            status: TaskStatus::Queued,
            progress: None,
            result_id: None,
            task_type: task_type.into(),
            step_number,
            depends_on: None,
            workflow_id: workflow.workflow_id,
            created_at: Utc::now(),
        }
    }
}

/// A task together with its eagerly loaded owning workflow.
///
/// This is what the scheduling loop hands to the task runner, and what jobs
/// receive: report-style jobs need the workflow id and client.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTask {
    pub task: Task,
    pub workflow: Workflow,
}

impl LoadedTask {
    pub fn new(task: Task, workflow: Workflow) -> Self {
        Self { task, workflow }
    }

    pub fn task_id(&self) -> Uuid {
        self.task.task_id
    }
}

// src/jobs/notification.rs

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::jobs::{Job, JobResult};
use crate::model::LoadedTask;

/// Simulated email dispatch to the workflow's client. Produces no output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationJob;

#[async_trait]
impl Job for NotificationJob {
    async fn run(&self, task: &LoadedTask) -> JobResult {
        info!(
            recipient = %task.task.client_id,
            subject = "Workflow update",
            workflow_id = %task.workflow.workflow_id,
            task_id = %task.task_id(),
            "sending notification"
        );
        Ok(Value::Null)
    }
}

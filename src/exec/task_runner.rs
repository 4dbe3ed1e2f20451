// src/exec/task_runner.rs

//! Runs one task through to a terminal state.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::dag::state::reconcile_workflow_status;
use crate::errors::{GeoflowError, JobError, Result};
use crate::jobs::JobRegistry;
use crate::model::{LoadedTask, ResultRecord, Task};
use crate::store::SharedStore;
use crate::types::TaskStatus;

/// The execution state machine: `Queued -> Running -> {Completed, Failed}`.
///
/// Each transition is persisted before the next step starts, so a crash in
/// the middle of a job leaves the task visibly `Running`.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    store: SharedStore,
    registry: JobRegistry,
    job_timeout: Option<Duration>,
}

impl TaskRunner {
    pub fn new(store: SharedStore, registry: JobRegistry) -> Self {
        Self {
            store,
            registry,
            job_timeout: None,
        }
    }

    /// Bound every job invocation; an expired job fails its task.
    pub fn with_job_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Execute `loaded` end to end and return the completed task.
    ///
    /// Errors:
    /// - [`GeoflowError::TaskNotQueued`]: the task already left `Queued`;
    ///   nothing is written.
    /// - [`GeoflowError::UnknownTaskType`]: no job for the type; the task
    ///   stays `Queued`.
    /// - [`GeoflowError::ClaimLost`]: another worker claimed it first.
    /// - [`GeoflowError::JobExecution`]: the job failed (or timed out) and
    ///   the task is now `Failed`.
    pub async fn run(&self, loaded: LoadedTask) -> Result<Task> {
        let task_id = loaded.task_id();
        let task_type = loaded.task.task_type.clone();

        if loaded.task.status != TaskStatus::Queued {
            return Err(GeoflowError::TaskNotQueued {
                task_id,
                status: loaded.task.status,
            });
        }

        let job = self.registry.resolve(&task_type)?;

        let Some(claimed) = self.store.claim_task(task_id).await? else {
            debug!(%task_id, "task claimed elsewhere");
            return Err(GeoflowError::ClaimLost(task_id));
        };
        info!(%task_id, task_type = %task_type, workflow_id = %loaded.workflow.workflow_id, "task running");

        self.reconcile_workflow(loaded.workflow.workflow_id).await;

        let running = LoadedTask::new(claimed, loaded.workflow);
        let outcome = match self.job_timeout {
            Some(limit) => match tokio::time::timeout(limit, job.run(&running)).await {
                Ok(res) => res,
                Err(_) => Err(JobError::Timeout(limit)),
            },
            None => job.run(&running).await,
        };

        let result = match outcome {
            Ok(output) => self.persist_success(task_id, output).await,
            Err(source) => {
                warn!(%task_id, task_type = %task_type, error = %source, "job failed");
                if let Err(e) = self.store.fail_task(task_id).await {
                    error!(%task_id, error = %e, "could not persist task failure");
                }
                Err(GeoflowError::JobExecution { task_id, source })
            }
        };

        self.reconcile_workflow(running.workflow.workflow_id).await;
        result
    }

    async fn persist_success(&self, task_id: Uuid, output: Value) -> Result<Task> {
        let progress = progress_text(&output);
        let record = ResultRecord::new(task_id, progress.clone());

        match self.store.complete_task(task_id, progress, record).await {
            Ok(task) => {
                info!(%task_id, "task completed");
                Ok(task)
            }
            Err(e) => {
                error!(%task_id, error = %e, "could not persist task completion");
                if let Err(e) = self.store.fail_task(task_id).await {
                    error!(%task_id, error = %e, "could not persist task failure");
                }
                Err(e.into())
            }
        }
    }

    /// Move the workflow forward to match its tasks. Failures are logged,
    /// the task's own outcome stands.
    async fn reconcile_workflow(&self, workflow_id: Uuid) {
        if let Err(e) = self.try_reconcile_workflow(workflow_id).await {
            warn!(%workflow_id, error = %e, "could not update workflow status");
        }
    }

    async fn try_reconcile_workflow(&self, workflow_id: Uuid) -> Result<()> {
        let workflow = self
            .store
            .get_workflow(workflow_id)
            .await?
            .ok_or(GeoflowError::WorkflowNotFound(workflow_id))?;
        let tasks = self.store.tasks_for_workflow(workflow_id).await?;

        let Some(next) = reconcile_workflow_status(workflow.status, &tasks) else {
            return Ok(());
        };
        if self.store.advance_workflow_status(workflow_id, next).await? {
            info!(%workflow_id, from = %workflow.status, to = %next, "workflow status changed");
        }
        Ok(())
    }
}

/// Strings are stored verbatim, `null` as nothing, anything else as JSON.
fn progress_text(output: &Value) -> Option<String> {
    match output {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn progress_keeps_strings_verbatim() {
        assert_eq!(progress_text(&json!("done")), Some("done".to_string()));
        assert_eq!(progress_text(&json!(12.5)), Some("12.5".to_string()));
        assert_eq!(progress_text(&Value::Null), None);
        assert_eq!(
            progress_text(&json!({"a": 1})),
            Some("{\"a\":1}".to_string())
        );
    }
}
